//! Payload conversion from row-oriented formats to Parquet.
//!
//! The schema is inferred from the data (CSV header + sampled rows, or
//! JSON record structure); there is no explicit schema contract. The
//! conversion is lossless: every row and every column of the input appears
//! in the output, in the same order.

use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use arrow::array::RecordBatch;
use arrow::csv;
use arrow::csv::reader::Format;
use arrow::datatypes::SchemaRef;
use arrow::json::reader::infer_json_schema_from_iterator;
use arrow::json::ReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde_json::Value;
use snafu::prelude::*;
use tracing::debug;

use crate::error::{
    CreateOutputSnafu, CsvDecodeSnafu, CsvInferSnafu, JsonDecodeSnafu, JsonInferSnafu,
    JsonParseSnafu, OpenInputSnafu, ParquetWriteSnafu, TransformError,
};
use crate::params::PayloadFormat;

/// Number of records to sample for schema inference.
const SAMPLE_SIZE: usize = 1000;

/// Number of records per decoded batch.
const BATCH_SIZE: usize = 8192;

/// Summary of one conversion.
#[derive(Debug, Clone)]
pub struct TransformReport {
    /// Total rows written to the Parquet file.
    pub rows: usize,
    /// Column names, in output order.
    pub columns: Vec<String>,
}

/// Convert a row-oriented scratch file into a Parquet scratch file.
///
/// A parseable payload with zero rows is valid: the header (or JSON
/// structure) still yields a schema, and the output is a zero-row table.
pub fn convert_to_parquet(
    input: &Path,
    output: &Path,
    format: PayloadFormat,
) -> Result<TransformReport, TransformError> {
    let (schema, batches) = match format {
        PayloadFormat::Csv => decode_csv(input)?,
        PayloadFormat::Json => decode_json(input)?,
    };

    let columns: Vec<String> = schema.fields().iter().map(|f| f.name().clone()).collect();

    let out = File::create(output).context(CreateOutputSnafu {
        path: output.display().to_string(),
    })?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(out, schema, Some(props)).context(ParquetWriteSnafu {
        path: output.display().to_string(),
    })?;

    let mut rows = 0;
    for batch in &batches {
        rows += batch.num_rows();
        writer.write(batch).context(ParquetWriteSnafu {
            path: output.display().to_string(),
        })?;
    }
    writer.close().context(ParquetWriteSnafu {
        path: output.display().to_string(),
    })?;

    debug!("Converted {} rows across {} columns", rows, columns.len());

    Ok(TransformReport { rows, columns })
}

/// Decode a CSV file with an inferred schema.
///
/// The header row is required; column order follows the header.
fn decode_csv(input: &Path) -> Result<(SchemaRef, Vec<RecordBatch>), TransformError> {
    let mut file = File::open(input).context(OpenInputSnafu {
        path: input.display().to_string(),
    })?;
    let format = Format::default().with_header(true);
    let (schema, _) = format
        .infer_schema(&mut file, Some(SAMPLE_SIZE))
        .context(CsvInferSnafu)?;
    file.seek(SeekFrom::Start(0)).context(OpenInputSnafu {
        path: input.display().to_string(),
    })?;

    let schema = Arc::new(schema);
    let reader = csv::ReaderBuilder::new(schema.clone())
        .with_format(format)
        .with_batch_size(BATCH_SIZE)
        .build(file)
        .context(CsvDecodeSnafu)?;

    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .context(CsvDecodeSnafu)?;
    Ok((schema, batches))
}

/// Decode a JSON file with an inferred schema.
///
/// Accepts an array of records, a single record, or newline-delimited
/// records.
fn decode_json(input: &Path) -> Result<(SchemaRef, Vec<RecordBatch>), TransformError> {
    let raw = std::fs::read(input).context(OpenInputSnafu {
        path: input.display().to_string(),
    })?;

    let rows = parse_json_records(&raw)?;

    let schema = Arc::new(
        infer_json_schema_from_iterator(rows.iter().map(Ok)).context(JsonInferSnafu)?,
    );

    let mut decoder = ReaderBuilder::new(schema.clone())
        .build_decoder()
        .context(JsonDecodeSnafu)?;
    decoder.serialize(&rows).context(JsonDecodeSnafu)?;

    let batches = decoder.flush().context(JsonDecodeSnafu)?.into_iter().collect();
    Ok((schema, batches))
}

/// Parse raw bytes into JSON record values.
fn parse_json_records(raw: &[u8]) -> Result<Vec<Value>, TransformError> {
    // A single document: either an array of records or one record.
    match serde_json::from_slice::<Value>(raw) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(value) => Ok(vec![value]),
        Err(err) => {
            // Fall back to newline-delimited records.
            let Ok(text) = std::str::from_utf8(raw) else {
                return Err(err).context(JsonParseSnafu);
            };
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(|line| serde_json::from_str::<Value>(line).context(JsonParseSnafu))
                .collect()
        }
    }
}
