//! Configuration handling for shiftd

/// Options for the delimited text codecs (csv, tsv)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvOptions {
    /// Run cells through scalar coercion instead of keeping them as text
    pub infer_types: bool,
}

/// Options for the JSON codec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonOptions {
    /// Pretty-print indent in spaces; `None` writes compact JSON
    pub indent: Option<usize>,
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self { indent: Some(2) }
    }
}

/// Options for the XML codec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlOptions {
    pub root_tag: String,
    pub row_tag: String,
}

impl Default for XmlOptions {
    fn default() -> Self {
        Self {
            root_tag: "root".to_string(),
            row_tag: "row".to_string(),
        }
    }
}

/// Options for the HTML codec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlOptions {
    /// Document title written by the encoder
    pub title: String,
    /// Which `<table>` in the document the decoder reads (0-based)
    pub table_index: usize,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            title: "Table".to_string(),
            table_index: 0,
        }
    }
}

/// Options for the TOML codec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TomlOptions {
    /// Name of the array of tables written by the encoder (`[[row]]`)
    pub table_name: String,
}

impl Default for TomlOptions {
    fn default() -> Self {
        Self {
            table_name: "row".to_string(),
        }
    }
}

/// Options for the database codecs (sqlite, duckdb)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlOptions {
    /// Table to read; the first table in the database when unset
    pub read_table: Option<String>,
    /// Table to (re)create when writing
    pub write_table: String,
}

impl Default for SqlOptions {
    fn default() -> Self {
        Self {
            read_table: None,
            write_table: "data".to_string(),
        }
    }
}

/// Options for the spreadsheet codec
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExcelOptions {
    /// Sheet to read; the first sheet when unset
    pub sheet_name: Option<String>,
}

/// How a batch reacts to a failing entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BatchMode {
    /// Stop at the first failure
    #[default]
    FailFast,
    /// Convert every entry and collect the failures
    BestEffort,
}

/// Options for batch conversions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOptions {
    pub mode: BatchMode,
    /// Convert entries on the rayon thread pool
    pub parallel: bool,
}

/// Configuration for conversions, one option block per codec
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub csv: CsvOptions,
    pub json: JsonOptions,
    pub xml: XmlOptions,
    pub html: HtmlOptions,
    pub toml: TomlOptions,
    pub sql: SqlOptions,
    pub excel: ExcelOptions,
    pub batch: BatchOptions,
}

impl Config {
    /// Create a configuration with every default
    pub fn new() -> Self {
        Self::default()
    }

    /// Coerce csv/tsv cells to typed scalars
    pub fn with_infer_types(mut self, infer: bool) -> Self {
        self.csv.infer_types = infer;
        self
    }

    /// Set the JSON indent (`None` for compact output)
    pub fn with_json_indent(mut self, indent: Option<usize>) -> Self {
        self.json.indent = indent;
        self
    }

    /// Set the XML root and row element names
    pub fn with_xml_tags(mut self, root_tag: impl Into<String>, row_tag: impl Into<String>) -> Self {
        self.xml.root_tag = root_tag.into();
        self.xml.row_tag = row_tag.into();
        self
    }

    /// Set the HTML document title
    pub fn with_html_title(mut self, title: impl Into<String>) -> Self {
        self.html.title = title.into();
        self
    }

    /// Set which HTML table is read
    pub fn with_html_table_index(mut self, index: usize) -> Self {
        self.html.table_index = index;
        self
    }

    /// Set the TOML array-of-tables name
    pub fn with_toml_table_name(mut self, name: impl Into<String>) -> Self {
        self.toml.table_name = name.into();
        self
    }

    /// Read and write this database table
    pub fn with_sql_table(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.sql.read_table = Some(name.clone());
        self.sql.write_table = name;
        self
    }

    /// Set Excel sheet name
    pub fn with_sheet_name(mut self, name: impl Into<String>) -> Self {
        self.excel.sheet_name = Some(name.into());
        self
    }

    /// Set the batch failure mode
    pub fn with_batch_mode(mut self, mode: BatchMode) -> Self {
        self.batch.mode = mode;
        self
    }

    /// Run batch entries in parallel
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.batch.parallel = parallel;
        self
    }
}
