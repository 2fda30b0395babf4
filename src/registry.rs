//! Capability registry: format name to decoder/encoder factories

use std::collections::BTreeMap;

use once_cell::sync::Lazy;

use crate::codec::{
    ArrowCodec, Decoder, DelimitedCodec, Encoder, ExcelDecoder, HtmlCodec, JsonCodec,
    JsonLinesCodec, MarkdownCodec, ParquetCodec, SqliteCodec, TomlCodec, ToonCodec, XmlCodec,
    YamlCodec,
};
use crate::config::Config;
use crate::error::{Error, Result};

/// Builds a decoder from the engine configuration
pub type DecoderFactory = Box<dyn Fn(&Config) -> Box<dyn Decoder> + Send + Sync>;

/// Builds an encoder from the engine configuration
pub type EncoderFactory = Box<dyn Fn(&Config) -> Box<dyn Encoder> + Send + Sync>;

/// One side (read or write) of a registered format
enum Capability<F> {
    Available(F),
    Unavailable(String),
}

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::with_builtin_codecs);

/// Lookup table of codec factories keyed by lower-cased format name
#[derive(Default)]
pub struct Registry {
    decoders: BTreeMap<String, Capability<DecoderFactory>>,
    encoders: BTreeMap<String, Capability<EncoderFactory>>,
}

impl Registry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry holding every built-in codec
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    /// A registry holding every built-in codec
    pub fn with_builtin_codecs() -> Self {
        let mut registry = Self::new();

        registry.register(
            "csv",
            |c| Box::new(DelimitedCodec::csv(c)),
            |c| Box::new(DelimitedCodec::csv(c)),
        );
        registry.register(
            "tsv",
            |c| Box::new(DelimitedCodec::tsv(c)),
            |c| Box::new(DelimitedCodec::tsv(c)),
        );
        registry.register("json", |c| Box::new(JsonCodec::new(c)), |c| Box::new(JsonCodec::new(c)));
        registry.register("jsonl", |_| Box::new(JsonLinesCodec), |_| Box::new(JsonLinesCodec));
        registry.register("xml", |c| Box::new(XmlCodec::new(c)), |c| Box::new(XmlCodec::new(c)));
        registry.register("html", |c| Box::new(HtmlCodec::new(c)), |c| Box::new(HtmlCodec::new(c)));
        registry.register("markdown", |_| Box::new(MarkdownCodec), |_| Box::new(MarkdownCodec));
        registry.register("toml", |c| Box::new(TomlCodec::new(c)), |c| Box::new(TomlCodec::new(c)));
        registry.register("yaml", |_| Box::new(YamlCodec), |_| Box::new(YamlCodec));
        registry.register("yml", |_| Box::new(YamlCodec), |_| Box::new(YamlCodec));
        registry.register("parquet", |_| Box::new(ParquetCodec), |_| Box::new(ParquetCodec));
        registry.register("arrow", |_| Box::new(ArrowCodec), |_| Box::new(ArrowCodec));
        registry.register("toon", |_| Box::new(ToonCodec), |_| Box::new(ToonCodec));
        registry.register(
            "sqlite",
            |c| Box::new(SqliteCodec::new(c)),
            |c| Box::new(SqliteCodec::new(c)),
        );

        for name in ["xlsx", "excel"] {
            registry.register_decoder(name, |c| Box::new(ExcelDecoder::new(c)));
            registry.register_unavailable_encoder(name, "spreadsheet writing is not supported");
        }

        #[cfg(feature = "duckdb")]
        registry.register(
            "duckdb",
            |c| Box::new(crate::codec::DuckDbCodec::new(c)),
            |c| Box::new(crate::codec::DuckDbCodec::new(c)),
        );
        #[cfg(not(feature = "duckdb"))]
        registry.register_unavailable("duckdb", "built without the `duckdb` feature");

        registry
    }

    /// Register both sides of a format; a later registration of the same name wins
    pub fn register<D, E>(&mut self, name: &str, decoder: D, encoder: E)
    where
        D: Fn(&Config) -> Box<dyn Decoder> + Send + Sync + 'static,
        E: Fn(&Config) -> Box<dyn Encoder> + Send + Sync + 'static,
    {
        self.register_decoder(name, decoder);
        self.register_encoder(name, encoder);
    }

    /// Register a read-only format
    pub fn register_decoder<D>(&mut self, name: &str, decoder: D)
    where
        D: Fn(&Config) -> Box<dyn Decoder> + Send + Sync + 'static,
    {
        self.decoders
            .insert(name.to_lowercase(), Capability::Available(Box::new(decoder)));
    }

    /// Register a write-only format
    pub fn register_encoder<E>(&mut self, name: &str, encoder: E)
    where
        E: Fn(&Config) -> Box<dyn Encoder> + Send + Sync + 'static,
    {
        self.encoders
            .insert(name.to_lowercase(), Capability::Available(Box::new(encoder)));
    }

    /// Register a known format whose codec is not compiled in
    pub fn register_unavailable(&mut self, name: &str, reason: &str) {
        self.decoders
            .insert(name.to_lowercase(), Capability::Unavailable(reason.to_string()));
        self.register_unavailable_encoder(name, reason);
    }

    /// Mark only the write side of a format as unavailable
    pub fn register_unavailable_encoder(&mut self, name: &str, reason: &str) {
        self.encoders
            .insert(name.to_lowercase(), Capability::Unavailable(reason.to_string()));
    }

    /// Find the decoder factory for a format name (case-insensitive)
    pub fn resolve_decoder(&self, name: &str) -> Result<&DecoderFactory> {
        match self.decoders.get(&name.to_lowercase()) {
            Some(Capability::Available(factory)) => Ok(factory),
            Some(Capability::Unavailable(reason)) => Err(Error::Unavailable {
                name: name.to_string(),
                reason: reason.clone(),
            }),
            None => Err(Error::UnknownFormat {
                name: name.to_string(),
                known: self.readable_formats(),
            }),
        }
    }

    /// Find the encoder factory for a format name (case-insensitive)
    pub fn resolve_encoder(&self, name: &str) -> Result<&EncoderFactory> {
        match self.encoders.get(&name.to_lowercase()) {
            Some(Capability::Available(factory)) => Ok(factory),
            Some(Capability::Unavailable(reason)) => Err(Error::Unavailable {
                name: name.to_string(),
                reason: reason.clone(),
            }),
            None => Err(Error::UnknownFormat {
                name: name.to_string(),
                known: self.writable_formats(),
            }),
        }
    }

    /// Build a decoder for a format
    pub fn decoder(&self, name: &str, config: &Config) -> Result<Box<dyn Decoder>> {
        self.resolve_decoder(name).map(|factory| factory(config))
    }

    /// Build an encoder for a format
    pub fn encoder(&self, name: &str, config: &Config) -> Result<Box<dyn Encoder>> {
        self.resolve_encoder(name).map(|factory| factory(config))
    }

    /// Sorted names of every format that can be read
    pub fn readable_formats(&self) -> Vec<String> {
        available(&self.decoders)
    }

    /// Sorted names of every format that can be written
    pub fn writable_formats(&self) -> Vec<String> {
        available(&self.encoders)
    }
}

fn available<F>(entries: &BTreeMap<String, Capability<F>>) -> Vec<String> {
    entries
        .iter()
        .filter(|(_, cap)| matches!(cap, Capability::Available(_)))
        .map(|(name, _)| name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::error::ErrorKind;
    use crate::model::Table;

    struct FixedDecoder(usize);

    impl Decoder for FixedDecoder {
        fn decode(&self, _source: &Path) -> Result<Table> {
            let columns = (0..self.0).map(|i| format!("c{}", i)).collect();
            Ok(Table::new(columns, Vec::new())?)
        }
    }

    #[test]
    fn test_builtin_formats_are_listed_sorted() {
        let registry = Registry::with_builtin_codecs();
        let read = registry.readable_formats();
        let write = registry.writable_formats();

        for name in ["csv", "json", "toon", "xlsx", "excel", "sqlite", "yml"] {
            assert!(read.contains(&name.to_string()), "{} missing", name);
        }
        assert!(!write.contains(&"xlsx".to_string()));
        assert!(write.contains(&"toon".to_string()));

        let mut sorted = read.clone();
        sorted.sort();
        assert_eq!(read, sorted);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = Registry::with_builtin_codecs();
        assert!(registry.resolve_decoder("CSV").is_ok());
        assert!(registry.resolve_encoder("Json").is_ok());
    }

    #[test]
    fn test_unknown_format_lists_known_names() {
        let registry = Registry::with_builtin_codecs();
        let err = registry.resolve_decoder("bogus").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::UnknownFormat);
        assert!(err.to_string().contains("Unknown format: bogus"));
        assert!(err.to_string().contains("csv"));
    }

    #[test]
    fn test_spreadsheet_writing_is_unavailable() {
        let registry = Registry::with_builtin_codecs();
        let err = registry.resolve_encoder("xlsx").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::UnavailableCapability);
    }

    #[cfg(not(feature = "duckdb"))]
    #[test]
    fn test_duckdb_without_feature_is_unavailable() {
        let registry = Registry::with_builtin_codecs();
        let err = registry.resolve_decoder("duckdb").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::UnavailableCapability);
        assert!(!registry.readable_formats().contains(&"duckdb".to_string()));
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = Registry::new();
        registry.register_decoder("fake", |_| Box::new(FixedDecoder(1)));
        registry.register_decoder("FAKE", |_| Box::new(FixedDecoder(3)));

        let decoder = registry.decoder("fake", &Config::default()).unwrap();
        let table = decoder.decode(Path::new("ignored")).unwrap();
        assert_eq!(table.column_count(), 3);
        assert_eq!(registry.readable_formats(), vec!["fake".to_string()]);
        assert!(registry.writable_formats().is_empty());
    }

    #[test]
    fn test_global_registry_is_shared() {
        assert!(std::ptr::eq(Registry::global(), Registry::global()));
        assert!(Registry::global().resolve_decoder("toon").is_ok());
    }
}
