use std::fmt::Display;
use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use tabwire_frame::{Frame, ELEMENT_SIZE};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize, Debug)]
pub struct FrameOutput {
    pub kind: &'static str,
    pub payload_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cols: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Vec<f64>>>,
    pub peer: String,
    pub timestamp: String,
}

impl FrameOutput {
    pub fn new(frame: &Frame, peer: impl Display) -> Self {
        let mut out = Self {
            kind: kind_name(frame),
            payload_size: frame.payload_len(),
            payload: None,
            rows: None,
            cols: None,
            values: None,
            peer: peer.to_string(),
            timestamp: now_unix_seconds(),
        };
        match frame {
            Frame::Raw(payload) => out.payload = Some(payload_preview(payload.as_ref())),
            Frame::Table(table) => {
                out.rows = Some(table.rows());
                out.cols = Some(table.cols());
                out.values = Some(table.to_rows());
            }
        }
        out
    }

    fn summary(&self) -> String {
        match (&self.payload, self.rows, self.cols) {
            (Some(payload), _, _) => payload.clone(),
            (None, Some(rows), Some(cols)) => format!("{rows}x{cols} matrix"),
            _ => String::new(),
        }
    }
}

pub fn print_frame(frame: &Frame, peer: impl Display, format: OutputFormat) {
    let out = FrameOutput::new(frame, peer);
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KIND", "SIZE", "PEER", "PAYLOAD"])
                .add_row(vec![
                    out.kind.to_string(),
                    out.payload_size.to_string(),
                    out.peer.clone(),
                    out.summary(),
                ]);
            println!("{table}");
            if let Frame::Table(matrix) = frame {
                println!("{}", matrix_table(&matrix.to_rows()));
            }
        }
        OutputFormat::Pretty => {
            println!(
                "kind={} size={} peer={} payload={}",
                out.kind,
                out.payload_size,
                out.peer,
                out.summary()
            );
            if let Some(values) = &out.values {
                for row in values {
                    println!("  {}", format_row(row));
                }
            }
        }
        OutputFormat::Raw => match frame {
            Frame::Raw(payload) => print_raw(payload.as_ref()),
            Frame::Table(table) => {
                let mut bytes = Vec::with_capacity(table.len() * ELEMENT_SIZE);
                for value in table.values() {
                    bytes.extend_from_slice(&value.to_le_bytes());
                }
                print_raw(&bytes);
            }
        },
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn matrix_table(rows: &[Vec<f64>]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    for row in rows {
        table.add_row(row.iter().map(|v| v.to_string()).collect::<Vec<_>>());
    }
    table
}

fn format_row(row: &[f64]) -> String {
    row.iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn kind_name(frame: &Frame) -> &'static str {
    match frame {
        Frame::Raw(_) => "raw",
        Frame::Table(_) => "table",
    }
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use tabwire_frame::Table as Matrix;

    use super::*;

    fn peer() -> std::net::SocketAddr {
        "127.0.0.1:10000".parse().unwrap()
    }

    #[test]
    fn raw_frame_output() {
        let out = FrameOutput::new(&Frame::raw(&b"Hello"[..]), peer());
        let json = serde_json::to_value(&out).unwrap();

        assert_eq!(json["kind"], "raw");
        assert_eq!(json["payload_size"], 5);
        assert_eq!(json["payload"], "Hello");
        assert!(json.get("rows").is_none());
        assert_eq!(json["peer"], "127.0.0.1:10000");
    }

    #[test]
    fn table_frame_output() {
        let matrix = Matrix::from_rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]).unwrap();
        let out = FrameOutput::new(&Frame::Table(matrix), peer());
        let json = serde_json::to_value(&out).unwrap();

        assert_eq!(json["kind"], "table");
        assert_eq!(json["payload_size"], 48);
        assert_eq!(json["rows"], 2);
        assert_eq!(json["cols"], 3);
        assert_eq!(json["values"], serde_json::json!([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]));
        assert!(json.get("payload").is_none());
        assert_eq!(out.summary(), "2x3 matrix");
    }

    #[test]
    fn binary_payload_preview() {
        let out = FrameOutput::new(&Frame::raw(vec![0xFF, 0xFE]), peer());
        assert_eq!(out.payload.as_deref(), Some("<binary 2 bytes>"));
    }
}
