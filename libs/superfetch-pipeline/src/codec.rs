//! Record codec
//!
//! Inputs and segments are Avro object container files. Inputs only need a
//! `url` string field; segments use the fixed result schema below.

use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;
use std::sync::LazyLock;

use apache_avro::{types::Value, Codec, Reader, Schema, Writer};
use superfetch_domain::{FetchOutcome, ResultRecord, WorkItem};

use crate::error::{PipelineError, Result};

/// Schema of every record written to a segment
pub const RESULT_SCHEMA_JSON: &str = r#"{
  "type": "record",
  "name": "Result",
  "fields": [
    { "name": "url", "type": "string" },
    { "name": "content", "type": ["null", "bytes"] },
    { "name": "error", "type": ["null", "string"], "default": null }
  ]
}"#;

/// Schema used when writing input files
pub const WORK_ITEM_SCHEMA_JSON: &str = r#"{
  "type": "record",
  "name": "Input",
  "fields": [
    { "name": "url", "type": "string" }
  ]
}"#;

static RESULT_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::parse_str(RESULT_SCHEMA_JSON).expect("result schema is valid Avro")
});

static WORK_ITEM_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::parse_str(WORK_ITEM_SCHEMA_JSON).expect("work item schema is valid Avro")
});

/// Block compression of a container file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    Null,
    Deflate,
    #[default]
    Zstandard,
}

impl Compression {
    fn codec(self) -> Codec {
        match self {
            Self::Null => Codec::Null,
            Self::Deflate => Codec::Deflate,
            Self::Zstandard => Codec::Zstandard,
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Deflate => "deflate",
            Self::Zstandard => "zstandard",
        };
        write!(f, "{}", name)
    }
}

/// Unknown compression name
#[derive(Debug, thiserror::Error)]
#[error("Unknown compression '{0}': expected null, deflate or zstandard")]
pub struct UnknownCompression(String);

impl FromStr for Compression {
    type Err = UnknownCompression;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "null" | "none" => Ok(Self::Null),
            "deflate" => Ok(Self::Deflate),
            "zstandard" | "zstd" => Ok(Self::Zstandard),
            _ => Err(UnknownCompression(s.to_string())),
        }
    }
}

/// Create a segment writer over `output`
pub fn result_writer<W: Write>(output: W, compression: Compression) -> Writer<'static, W> {
    Writer::with_codec(&RESULT_SCHEMA, output, compression.codec())
}

/// Encode a result record as a value of the result schema
pub fn result_to_value(record: &ResultRecord) -> Value {
    let null = || Value::Union(0, Box::new(Value::Null));

    let (content, error) = match record.outcome() {
        FetchOutcome::Content(content) => (
            Value::Union(1, Box::new(Value::Bytes(content.to_vec()))),
            null(),
        ),
        FetchOutcome::Error(error) => (null(), Value::Union(1, Box::new(Value::String(error.clone())))),
    };

    Value::Record(vec![
        ("url".to_string(), Value::String(record.url().to_string())),
        ("content".to_string(), content),
        ("error".to_string(), error),
    ])
}

/// Decode a value of the result schema
///
/// A record with neither content nor error, or with both, is rejected.
pub fn result_from_value(value: Value) -> std::result::Result<ResultRecord, String> {
    let fields = match value {
        Value::Record(fields) => fields,
        other => return Err(format!("expected a record, found {:?}", other)),
    };

    let mut url = None;
    let mut content = None;
    let mut error = None;

    for (name, field) in fields {
        match name.as_str() {
            "url" => url = Some(expect_string(&name, field)?),
            "content" => {
                content = match unwrap_union(field) {
                    Value::Null => None,
                    Value::Bytes(bytes) => Some(bytes),
                    other => return Err(format!("field 'content' is not bytes: {:?}", other)),
                }
            }
            "error" => {
                error = match unwrap_union(field) {
                    Value::Null => None,
                    Value::String(error) => Some(error),
                    other => return Err(format!("field 'error' is not a string: {:?}", other)),
                }
            }
            _ => {}
        }
    }

    let url = url.ok_or_else(|| "missing field 'url'".to_string())?;
    let outcome = match (content, error) {
        (Some(content), None) => FetchOutcome::Content(content.into()),
        (None, Some(error)) => FetchOutcome::Error(error),
        (None, None) => return Err(format!("record for '{}' has neither content nor error", url)),
        (Some(_), Some(_)) => return Err(format!("record for '{}' has both content and error", url)),
    };

    Ok(ResultRecord::from_parts(url, outcome))
}

/// Decode a work item from any record with a `url` string field
pub fn work_item_from_value(value: Value) -> std::result::Result<WorkItem, String> {
    let fields = match value {
        Value::Record(fields) => fields,
        other => return Err(format!("expected a record, found {:?}", other)),
    };

    fields
        .into_iter()
        .find(|(name, _)| name == "url")
        .ok_or_else(|| "missing field 'url'".to_string())
        .and_then(|(name, field)| expect_string(&name, field))
        .map(WorkItem::from)
}

fn unwrap_union(value: Value) -> Value {
    match value {
        Value::Union(_, inner) => *inner,
        other => other,
    }
}

fn expect_string(name: &str, value: Value) -> std::result::Result<String, String> {
    match unwrap_union(value) {
        Value::String(s) => Ok(s),
        other => Err(format!("field '{}' is not a string: {:?}", name, other)),
    }
}

/// Decode every work item of an input container, in order
///
/// `emit` receives each item and returns `false` to stop early. Returns the
/// number of items emitted.
pub fn decode_work_items<R, F>(input: R, context: &str, mut emit: F) -> Result<u64>
where
    R: Read,
    F: FnMut(WorkItem) -> bool,
{
    let reader = Reader::new(input).map_err(|err| PipelineError::codec(context, err))?;

    let mut emitted = 0;
    for value in reader {
        let value = value.map_err(|err| PipelineError::codec(context, err))?;
        let item =
            work_item_from_value(value).map_err(|reason| PipelineError::invalid_record(context, reason))?;

        emitted += 1;
        if !emit(item) {
            break;
        }
    }

    Ok(emitted)
}

/// Read every result record of a segment
pub fn read_results<R: Read>(input: R, context: &str) -> Result<Vec<ResultRecord>> {
    let reader = Reader::new(input).map_err(|err| PipelineError::codec(context, err))?;

    reader
        .map(|value| {
            let value = value.map_err(|err| PipelineError::codec(context, err))?;
            result_from_value(value).map_err(|reason| PipelineError::invalid_record(context, reason))
        })
        .collect()
}

/// Write an input container holding the given URLs
pub fn write_work_items<W, I>(output: W, urls: I, compression: Compression) -> Result<W>
where
    W: Write,
    I: IntoIterator,
    I::Item: Into<String>,
{
    let mut writer = Writer::with_codec(&WORK_ITEM_SCHEMA, output, compression.codec());

    for url in urls {
        let record = Value::Record(vec![("url".to_string(), Value::String(url.into()))]);
        writer
            .append(record)
            .map_err(|err| PipelineError::codec("input container", err))?;
    }

    writer
        .into_inner()
        .map_err(|err| PipelineError::codec("input container", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn sample_records() -> Vec<ResultRecord> {
        vec![
            ResultRecord::success(WorkItem::new("http://a/"), "hello"),
            ResultRecord::success(WorkItem::new("http://b/"), Vec::new()),
            ResultRecord::failure(WorkItem::new("http://c/"), "status: 404 Not Found"),
            ResultRecord::failure(WorkItem::new("http://d/"), ""),
        ]
    }

    #[test]
    fn test_segment_round_trip() {
        for compression in [Compression::Null, Compression::Deflate, Compression::Zstandard] {
            let mut writer = result_writer(Vec::new(), compression);
            for record in sample_records() {
                writer.append(result_to_value(&record)).unwrap();
            }
            let bytes = writer.into_inner().unwrap();

            let decoded = read_results(bytes.as_slice(), "test segment").unwrap();

            assert_eq!(decoded, sample_records(), "compression {}", compression);
        }
    }

    #[test]
    fn test_neither_content_nor_error_is_invalid() {
        let value = Value::Record(vec![
            ("url".to_string(), Value::String("http://a/".to_string())),
            ("content".to_string(), Value::Union(0, Box::new(Value::Null))),
            ("error".to_string(), Value::Union(0, Box::new(Value::Null))),
        ]);

        let err = result_from_value(value).unwrap_err();
        assert!(err.contains("neither"));
    }

    #[test]
    fn test_work_items_keep_input_order() {
        let urls = ["http://1/", "http://2/", "http://3/"];
        let bytes = write_work_items(Vec::new(), urls, Compression::Zstandard).unwrap();

        let mut decoded = Vec::new();
        let count = decode_work_items(bytes.as_slice(), "input", |item| {
            decoded.push(item.into_url());
            true
        })
        .unwrap();

        assert_eq!(count, 3);
        assert_eq!(decoded, urls);
    }

    #[test]
    fn test_decode_stops_when_emit_declines() {
        let bytes = write_work_items(Vec::new(), ["a", "b", "c"], Compression::Null).unwrap();

        let mut seen = HashSet::new();
        let count = decode_work_items(bytes.as_slice(), "input", |item| {
            seen.insert(item.into_url());
            false
        })
        .unwrap();

        assert_eq!(count, 1);
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn test_input_with_extra_fields_is_accepted() {
        let schema = Schema::parse_str(
            r#"{"type":"record","name":"Row","fields":[
                {"name":"id","type":"long"},
                {"name":"url","type":"string"}
            ]}"#,
        )
        .unwrap();
        let mut writer = Writer::new(&schema, Vec::new());
        writer
            .append(Value::Record(vec![
                ("id".to_string(), Value::Long(7)),
                ("url".to_string(), Value::String("http://x/".to_string())),
            ]))
            .unwrap();
        let bytes = writer.into_inner().unwrap();

        let mut decoded = Vec::new();
        decode_work_items(bytes.as_slice(), "input", |item| {
            decoded.push(item);
            true
        })
        .unwrap();

        assert_eq!(decoded, vec![WorkItem::new("http://x/")]);
    }

    #[test]
    fn test_garbage_input_is_a_codec_error() {
        let err = decode_work_items(&b"not avro at all"[..], "garbage", |_| true).unwrap_err();
        assert!(matches!(err, PipelineError::Codec { .. }));
    }

    #[test]
    fn test_compression_from_str() {
        assert_eq!("zstd".parse::<Compression>().unwrap(), Compression::Zstandard);
        assert_eq!("Deflate".parse::<Compression>().unwrap(), Compression::Deflate);
        assert_eq!("null".parse::<Compression>().unwrap(), Compression::Null);
        assert!("lz4".parse::<Compression>().is_err());
    }
}
