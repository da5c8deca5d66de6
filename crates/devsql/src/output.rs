use crate::engine::TableInfo;
use crate::Result;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use devsql_vtab::Value;
use serde_json::{Map, Value as Json};
use std::io::Write;

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Jsonl,
    Csv,
}

/// Writes query rows in one output format.
///
/// `jsonl` and `csv` are written row by row as the query runs; `table` and
/// `json` need every row and are written by [`OutputWriter::finish`].
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    header: bool,
    header_written: bool,
    buffered: Vec<Vec<Value>>,
}

impl<W: Write> OutputWriter<W> {
    pub fn new(writer: W, format: OutputFormat, header: bool) -> Self {
        Self {
            writer,
            format,
            header,
            header_written: false,
            buffered: Vec::new(),
        }
    }

    pub fn row(&mut self, columns: &[String], values: Vec<Value>) -> Result<()> {
        match self.format {
            OutputFormat::Jsonl => {
                let line = serde_json::to_string(&object(columns, &values))?;
                writeln!(self.writer, "{}", line)?;
            }
            OutputFormat::Csv => {
                self.csv_header(columns)?;
                let mut out = csv::Writer::from_writer(&mut self.writer);
                out.write_record(values.iter().map(cell))?;
                out.flush()?;
            }
            OutputFormat::Table | OutputFormat::Json => self.buffered.push(values),
        }
        Ok(())
    }

    pub fn finish(&mut self, columns: &[String]) -> Result<()> {
        match self.format {
            OutputFormat::Jsonl => {}
            OutputFormat::Csv => self.csv_header(columns)?,
            OutputFormat::Json => {
                let rows: Vec<Json> = self
                    .buffered
                    .iter()
                    .map(|values| object(columns, values))
                    .collect();
                writeln!(self.writer, "{}", serde_json::to_string_pretty(&rows)?)?;
            }
            OutputFormat::Table => {
                if self.buffered.is_empty() {
                    writeln!(self.writer, "No results")?;
                } else {
                    let mut table = create_table();
                    if self.header {
                        table.set_header(columns);
                    }
                    for values in &self.buffered {
                        table.add_row(values.iter().map(cell));
                    }
                    writeln!(self.writer, "{}", table)?;
                }
            }
        }
        self.buffered.clear();
        self.writer.flush()?;
        Ok(())
    }

    pub fn tables(&mut self, tables: &[TableInfo]) -> Result<()> {
        match self.format {
            OutputFormat::Table => {
                let mut table = create_table();
                if self.header {
                    table.set_header(["table", "arguments", "columns"]);
                }
                for info in tables {
                    table.add_row([
                        info.name.clone(),
                        info.arguments.join(", "),
                        info.columns.join(", "),
                    ]);
                }
                writeln!(self.writer, "{}", table)?;
            }
            OutputFormat::Json => {
                writeln!(self.writer, "{}", serde_json::to_string_pretty(tables)?)?;
            }
            OutputFormat::Jsonl => {
                for info in tables {
                    writeln!(self.writer, "{}", serde_json::to_string(info)?)?;
                }
            }
            OutputFormat::Csv => {
                let mut out = csv::Writer::from_writer(&mut self.writer);
                if self.header {
                    out.write_record(["table", "arguments", "columns"])?;
                }
                for info in tables {
                    out.write_record([
                        info.name.clone(),
                        info.arguments.join(" "),
                        info.columns.join(" "),
                    ])?;
                }
                out.flush()?;
            }
        }
        Ok(())
    }

    fn csv_header(&mut self, columns: &[String]) -> Result<()> {
        if self.header && !self.header_written {
            let mut out = csv::Writer::from_writer(&mut self.writer);
            out.write_record(columns)?;
            out.flush()?;
        }
        self.header_written = true;
        Ok(())
    }
}

pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn object(columns: &[String], values: &[Value]) -> Json {
    let map: Map<String, Json> = columns
        .iter()
        .cloned()
        .zip(values.iter().map(Value::to_json))
        .collect();
    Json::Object(map)
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Integer(n) => n.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => String::from_utf8_lossy(b).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<String> {
        vec!["hash".into(), "additions".into()]
    }

    fn render(format: OutputFormat, header: bool, rows: Vec<Vec<Value>>) -> String {
        let mut buf = Vec::new();
        {
            let mut out = OutputWriter::new(&mut buf, format, header);
            for row in rows {
                out.row(&columns(), row).unwrap();
            }
            out.finish(&columns()).unwrap();
        }
        String::from_utf8(buf).unwrap()
    }

    fn rows() -> Vec<Vec<Value>> {
        vec![
            vec![Value::from("abc"), Value::Integer(3)],
            vec![Value::from("d,e"), Value::Null],
        ]
    }

    #[test]
    fn test_jsonl_keeps_column_order() {
        let out = render(OutputFormat::Jsonl, true, rows());
        assert_eq!(
            out,
            "{\"hash\":\"abc\",\"additions\":3}\n{\"hash\":\"d,e\",\"additions\":null}\n"
        );
    }

    #[test]
    fn test_csv_quotes_and_header() {
        assert_eq!(
            render(OutputFormat::Csv, true, rows()),
            "hash,additions\nabc,3\n\"d,e\",\n"
        );
        assert_eq!(render(OutputFormat::Csv, false, rows()), "abc,3\n\"d,e\",\n");
        assert_eq!(render(OutputFormat::Csv, true, Vec::new()), "hash,additions\n");
    }

    #[test]
    fn test_json_array() {
        let out = render(OutputFormat::Json, true, rows());
        let parsed: Json = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[0]["hash"], "abc");
        assert_eq!(parsed[1]["additions"], Json::Null);
    }

    #[test]
    fn test_table_empty_and_filled() {
        assert_eq!(render(OutputFormat::Table, true, Vec::new()), "No results\n");
        let out = render(OutputFormat::Table, true, rows());
        assert!(out.contains("hash"));
        assert!(out.contains("abc"));
    }
}
