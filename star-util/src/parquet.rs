use parquet::basic::Type as ParquetType;
use parquet::basic::{Compression, ConvertedType, Repetition, ZstdLevel};
use parquet::data_type::{ByteArray, ByteArrayType, DoubleType};
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::file::writer::SerializedFileWriter;
use parquet::record::RowAccessor;
use parquet::schema::types::Type;
use std::fs::File;
use std::sync::Arc;

/// One named column of a flat table
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Utf8(Vec<Box<str>>),
    Double(Vec<f64>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Utf8(x) => x.len(),
            ColumnData::Double(x) => x.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn parquet_type(&self) -> ParquetType {
        match self {
            ColumnData::Utf8(_) => ParquetType::BYTE_ARRAY,
            ColumnData::Double(_) => ParquetType::DOUBLE,
        }
    }
}

///
/// Write named columns of equal length into one row group
///
/// * `file_path`: output file path
/// * `columns`: `(name, data)` in the order they should appear
///
pub fn write_parquet_columns(
    file_path: &str,
    columns: &[(Box<str>, ColumnData)],
) -> anyhow::Result<()> {
    let nrows = columns.first().map(|(_, x)| x.len()).unwrap_or(0);

    if let Some((name, _)) = columns.iter().find(|(_, x)| x.len() != nrows) {
        return Err(anyhow::anyhow!(
            "column {} does not have {} rows",
            name,
            nrows
        ));
    }

    let schema = build_columns_schema(columns)?;

    let zstd_level = ZstdLevel::try_new(5)?;
    let writer_properties = Arc::new(
        WriterProperties::builder()
            .set_compression(Compression::ZSTD(zstd_level))
            .build(),
    );

    let file = File::create(file_path)?;
    let mut writer = SerializedFileWriter::new(file, schema, writer_properties)?;
    let mut row_group_writer = writer.next_row_group()?;

    for (_, data) in columns.iter() {
        let Some(mut column_writer) = row_group_writer.next_column()? else {
            return Err(anyhow::anyhow!("schema has fewer columns than the data"));
        };

        match data {
            ColumnData::Utf8(values) => {
                let values: Vec<ByteArray> =
                    values.iter().map(|x| ByteArray::from(x.as_ref())).collect();
                column_writer
                    .typed::<ByteArrayType>()
                    .write_batch(&values, None, None)?;
            }
            ColumnData::Double(values) => {
                column_writer
                    .typed::<DoubleType>()
                    .write_batch(values, None, None)?;
            }
        }
        column_writer.close()?;
    }

    row_group_writer.close()?;
    writer.close()?;
    Ok(())
}

///
/// Read back every string or double column of a flat parquet file
///
pub fn read_parquet_columns(file_path: &str) -> anyhow::Result<Vec<(Box<str>, ColumnData)>> {
    let file = File::open(file_path)?;
    let reader = SerializedFileReader::new(file)?;
    let metadata = reader.metadata();
    let nrows = metadata.file_metadata().num_rows() as usize;
    let fields = metadata.file_metadata().schema().get_fields();

    let mut columns = fields
        .iter()
        .map(|f| -> anyhow::Result<(Box<str>, ColumnData)> {
            let data = match f.get_physical_type() {
                ParquetType::BYTE_ARRAY => Ok(ColumnData::Utf8(Vec::with_capacity(nrows))),
                ParquetType::DOUBLE => Ok(ColumnData::Double(Vec::with_capacity(nrows))),
                tt => Err(anyhow::anyhow!(
                    "column {} has unsupported type {}",
                    f.name(),
                    tt
                )),
            }?;
            Ok((f.name().to_string().into_boxed_str(), data))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    for record in reader.get_row_iter(None)? {
        let row = record?;
        for (j, (_, data)) in columns.iter_mut().enumerate() {
            match data {
                ColumnData::Utf8(values) => {
                    values.push(row.get_string(j)?.clone().into_boxed_str());
                }
                ColumnData::Double(values) => {
                    values.push(row.get_double(j)?);
                }
            }
        }
    }

    Ok(columns)
}

fn build_columns_schema(columns: &[(Box<str>, ColumnData)]) -> anyhow::Result<Arc<Type>> {
    let mut fields = Vec::with_capacity(columns.len());

    for (name, data) in columns.iter() {
        let builder = Type::primitive_type_builder(name, data.parquet_type())
            .with_repetition(Repetition::REQUIRED);

        let builder = match data {
            ColumnData::Utf8(_) => builder.with_converted_type(ConvertedType::UTF8),
            ColumnData::Double(_) => builder,
        };

        fields.push(Arc::new(builder.build()?));
    }

    let schema = Arc::new(Type::group_type_builder("table").with_fields(fields).build()?);

    Ok(schema)
}
