// External crates
use chrono::NaiveDateTime;
use encoding_rs::WINDOWS_1252;
use log::{debug, info, warn};
use polars::prelude::*;
use std::path::Path;
use std::str::FromStr;

// Internal modules
use crate::constants::{
    DEFAULT_VALUE_COLUMN, LONG_ID_COLUMN, LONG_TIMESTAMP_COLUMN, LONG_VALUE_COLUMN,
    SERIES_NAME_COLUMN, TSF_DATE_FORMAT, TSF_MISSING_TOKEN,
};
use crate::error::{FormatError, Result, ToolkitError};

/// Options for reading TSF files
#[derive(Debug, Clone)]
pub struct TsfReadOptions {
    /// Value substituted for `?` observations
    pub missing_value: f64,
    /// Name of the list column holding each series' observations
    pub value_column_name: String,
}

impl Default for TsfReadOptions {
    fn default() -> Self {
        Self {
            missing_value: f64::NAN,
            value_column_name: DEFAULT_VALUE_COLUMN.to_string(),
        }
    }
}

/// Series table and header metadata of a TSF file.
///
/// `frame` has one row per series: one column per declared attribute plus the
/// list-valued observation column.
#[derive(Debug, Clone)]
pub struct TsfData {
    pub frame: DataFrame,
    pub frequency: Option<String>,
    pub forecast_horizon: Option<i64>,
    pub contain_missing_values: Option<bool>,
    pub contain_equal_length: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttributeType {
    Numeric,
    Text,
    Date,
}

impl FromStr for AttributeType {
    type Err = FormatError;

    fn from_str(s: &str) -> std::result::Result<Self, FormatError> {
        match s {
            "numeric" => Ok(Self::Numeric),
            "string" => Ok(Self::Text),
            "date" => Ok(Self::Date),
            other => Err(FormatError::InvalidAttributeType(other.to_string())),
        }
    }
}

enum AttributeValues {
    Numeric(Vec<i64>),
    Text(Vec<String>),
    // Milliseconds since the epoch
    Date(Vec<i64>),
}

struct Attribute {
    name: String,
    values: AttributeValues,
}

impl Attribute {
    fn new(name: &str, kind: AttributeType) -> Self {
        let values = match kind {
            AttributeType::Numeric => AttributeValues::Numeric(Vec::new()),
            AttributeType::Text => AttributeValues::Text(Vec::new()),
            AttributeType::Date => AttributeValues::Date(Vec::new()),
        };
        Self {
            name: name.to_string(),
            values,
        }
    }

    fn push(&mut self, raw: &str, line: usize) -> std::result::Result<(), FormatError> {
        let invalid = || FormatError::InvalidAttributeValue {
            line,
            attribute: self.name.clone(),
            value: raw.to_string(),
        };

        match &mut self.values {
            AttributeValues::Numeric(values) => {
                values.push(raw.trim().parse::<i64>().map_err(|_| invalid())?)
            }
            AttributeValues::Text(values) => values.push(raw.to_string()),
            AttributeValues::Date(values) => {
                let date = NaiveDateTime::parse_from_str(raw.trim(), TSF_DATE_FORMAT)
                    .map_err(|_| invalid())?;
                values.push(date.and_utc().timestamp_millis());
            }
        }
        Ok(())
    }

    fn into_column(self) -> Result<Column> {
        let name = PlSmallStr::from(self.name);
        let series = match self.values {
            AttributeValues::Numeric(values) => Series::new(name, values),
            AttributeValues::Text(values) => Series::new(name, values),
            AttributeValues::Date(values) => Series::new(name, values)
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?,
        };
        Ok(series.into_column())
    }
}

/// Where the reader is in the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
    /// Header section: attributes and scalar metadata
    AwaitingAttributes,
    /// `@data` seen, no series yet
    AwaitingData,
    ReadingData,
}

struct TsfParser<'a> {
    options: &'a TsfReadOptions,
    state: ReaderState,
    attributes: Vec<Attribute>,
    series: Vec<Series>,
    frequency: Option<String>,
    forecast_horizon: Option<i64>,
    contain_missing_values: Option<bool>,
    contain_equal_length: Option<bool>,
    line_count: usize,
}

impl<'a> TsfParser<'a> {
    fn new(options: &'a TsfReadOptions) -> Self {
        Self {
            options,
            state: ReaderState::AwaitingAttributes,
            attributes: Vec::new(),
            series: Vec::new(),
            frequency: None,
            forecast_horizon: None,
            contain_missing_values: None,
            contain_equal_length: None,
            line_count: 0,
        }
    }

    fn feed(&mut self, line_number: usize, raw: &str) -> Result<()> {
        let line = raw.trim();
        if line.is_empty() {
            return Ok(());
        }
        self.line_count += 1;

        // Metadata, comment or series row
        if line.starts_with('@') {
            self.read_metadata(line_number, line)
        } else if line.starts_with('#') {
            Ok(())
        } else {
            self.read_series(line_number, line)
        }
    }

    fn read_metadata(&mut self, line_number: usize, line: &str) -> Result<()> {
        let invalid = || FormatError::InvalidMetadata {
            line: line_number,
            content: line.to_string(),
        };

        if self.state != ReaderState::AwaitingAttributes {
            return Err(invalid().into());
        }

        if line.starts_with("@data") {
            if self.attributes.is_empty() {
                return Err(FormatError::MissingAttributeSection.into());
            }
            self.state = ReaderState::AwaitingData;
            return Ok(());
        }

        // Attribute declarations are `@attribute <name> <type>`
        let tokens: Vec<&str> = line.split(' ').collect();

        if line.starts_with("@attribute") {
            let [_, name, kind] = tokens.as_slice() else {
                return Err(invalid().into());
            };
            self.attributes.push(Attribute::new(name, kind.parse()?));
            return Ok(());
        }

        let [tag, value] = tokens.as_slice() else {
            return Err(invalid().into());
        };
        match *tag {
            "@frequency" => self.frequency = Some(value.to_string()),
            "@horizon" => self.forecast_horizon = Some(value.parse().map_err(|_| invalid())?),
            "@missing" => self.contain_missing_values = Some(parse_flag(value).ok_or_else(invalid)?),
            "@equallength" => {
                self.contain_equal_length = Some(parse_flag(value).ok_or_else(invalid)?)
            }
            _ => debug!("Ignoring metadata at line {}: {}", line_number, line),
        }
        Ok(())
    }

    fn read_series(&mut self, line_number: usize, line: &str) -> Result<()> {
        match self.state {
            ReaderState::AwaitingAttributes if self.attributes.is_empty() => {
                return Err(FormatError::MissingAttributeSection.into())
            }
            ReaderState::AwaitingAttributes => return Err(FormatError::MissingDataTag.into()),
            ReaderState::AwaitingData => self.state = ReaderState::ReadingData,
            ReaderState::ReadingData => {}
        }

        // Attribute values followed by the comma-separated observations
        let fields: Vec<&str> = line.split(':').collect();
        let expected = self.attributes.len() + 1;
        if fields.len() != expected {
            return Err(FormatError::FieldCount {
                line: line_number,
                expected,
                found: fields.len(),
            }
            .into());
        }

        // Parse observations, substituting missing tokens
        let mut values = Vec::new();
        let mut missing = 0;
        for token in fields[expected - 1].split(',') {
            let token = token.trim();
            if token == TSF_MISSING_TOKEN {
                values.push(self.options.missing_value);
                missing += 1;
            } else {
                let value = token.parse::<f64>().map_err(|_| FormatError::InvalidValue {
                    line: line_number,
                    value: token.to_string(),
                })?;
                values.push(value);
            }
        }
        if missing == values.len() {
            return Err(ToolkitError::DataIntegrity(format!(
                "All series values are missing at line {}. At least one numeric value should be there in a series.",
                line_number
            )));
        }

        for (attribute, raw) in self.attributes.iter_mut().zip(&fields[..expected - 1]) {
            attribute.push(raw, line_number)?;
        }
        self.series.push(Series::new(PlSmallStr::EMPTY, values));
        Ok(())
    }

    fn finish(self) -> Result<TsfData> {
        if self.line_count == 0 {
            return Err(FormatError::EmptyFile.into());
        }
        if self.attributes.is_empty() {
            return Err(FormatError::MissingAttributeSection.into());
        }
        match self.state {
            ReaderState::AwaitingAttributes => return Err(FormatError::MissingDataTag.into()),
            ReaderState::AwaitingData => return Err(FormatError::MissingSeries.into()),
            ReaderState::ReadingData => {}
        }

        // One column per attribute plus the observation lists
        let mut columns = self
            .attributes
            .into_iter()
            .map(Attribute::into_column)
            .collect::<Result<Vec<_>>>()?;
        let value_column = PlSmallStr::from(self.options.value_column_name.as_str());
        columns.push(Series::new(value_column, self.series).into_column());

        Ok(TsfData {
            frame: DataFrame::new(columns)?,
            frequency: self.frequency,
            forecast_horizon: self.forecast_horizon,
            contain_missing_values: self.contain_missing_values,
            contain_equal_length: self.contain_equal_length,
        })
    }
}

/// Accepts the usual yes/no spellings used in TSF headers
fn parse_flag(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "y" | "yes" | "t" | "true" | "on" | "1" => Some(true),
        "n" | "no" | "f" | "false" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Parses TSF content that has already been decoded to text
pub fn parse_tsf(contents: &str, options: &TsfReadOptions) -> Result<TsfData> {
    let mut parser = TsfParser::new(options);
    for (index, line) in contents.lines().enumerate() {
        parser.feed(index + 1, line)?;
    }
    parser.finish()
}

/// Reads a TSF file into one row per series.
///
/// The file is decoded as Windows-1252.
pub fn convert_tsf_to_dataframe<P: AsRef<Path>>(path: P, options: &TsfReadOptions) -> Result<TsfData> {
    let path = path.as_ref();
    info!("Loading TSF data from: {}", path.display());

    let bytes = std::fs::read(path)?;
    let (contents, _, had_errors) = WINDOWS_1252.decode(&bytes);
    if had_errors {
        warn!("Replaced undecodable bytes in {}", path.display());
    }

    let data = parse_tsf(&contents, options)?;
    info!(
        "Loaded {} series (frequency: {:?}, horizon: {:?})",
        data.frame.height(),
        data.frequency,
        data.forecast_horizon
    );
    Ok(data)
}

/// Reshapes a series table into long format: `id`, `timestamp`, `value`.
///
/// The id comes from the `series_name` attribute. The timestamp is the 0-based
/// position of each observation in its series, not a calendar date.
pub fn tsf_to_long_format(frame: &DataFrame, value_column_name: &str) -> Result<DataFrame> {
    let names = frame
        .column(SERIES_NAME_COLUMN)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let observations = frame.column(value_column_name)?.as_materialized_series();

    let mut ids = Vec::new();
    let mut timestamps = Vec::new();
    let mut values = Vec::new();

    for (name, series) in names.str()?.into_iter().zip(observations.list()?.into_iter()) {
        let name = name.unwrap_or_default();
        let Some(series) = series else {
            continue;
        };
        for (position, value) in series.f64()?.into_iter().enumerate() {
            ids.push(name.to_string());
            timestamps.push(position as i64);
            values.push(value.unwrap_or(f64::NAN));
        }
    }

    Ok(DataFrame::new(vec![
        Series::new(LONG_ID_COLUMN.into(), ids).into_column(),
        Series::new(LONG_TIMESTAMP_COLUMN.into(), timestamps).into_column(),
        Series::new(LONG_VALUE_COLUMN.into(), values).into_column(),
    ])?)
}

/// Reads a TSF file straight into long format with default options
pub fn convert_tsf<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
    let data = convert_tsf_to_dataframe(path, &TsfReadOptions::default())?;
    tsf_to_long_format(&data.frame, DEFAULT_VALUE_COLUMN)
}
