use std::thread;

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table as OutputTable};
use serde::Serialize;
use tabwire_endpoint::{
    create_client, create_memory_pair, Endpoint, EndpointError, ServerListener,
};
use tabwire_frame::Table;

use crate::cmd::DemoArgs;
use crate::exit::{endpoint_error, CliError, CliResult, DATA_INVALID, INTERNAL, SUCCESS};
use crate::output::{matrix_table, print_json, OutputFormat};

const GREETING: &[u8] = b"Hello";
const MATRIX: [[f64; 3]; 2] = [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
const BUFFER_CAPACITY: usize = 1024;

#[derive(Serialize, Debug)]
struct DemoReport {
    server: String,
    bytes_sent: String,
    bytes_echoed: String,
    bytes_match: bool,
    rows: u32,
    cols: u32,
    matrix: Vec<Vec<f64>>,
    matrix_match: bool,
    passed: bool,
}

pub fn run(args: DemoArgs, format: OutputFormat) -> CliResult<i32> {
    let (server, client) = if args.memory {
        tracing::info!("demo running over an in-process endpoint pair");
        let (server, client) = create_memory_pair();
        (thread::spawn(move || echo_once(server)), client)
    } else {
        let listener =
            ServerListener::bind(&args.addr).map_err(|err| endpoint_error("bind failed", err))?;
        let addr = listener.local_addr();
        tracing::info!(%addr, "demo server listening");

        let server = thread::spawn(move || listener.accept().and_then(echo_once));
        // On connect failure the server thread may still be blocked; it ends with the process.
        let client = create_client(&addr.to_string())
            .map_err(|err| endpoint_error("connect failed", err))?;
        (server, client)
    };

    let report = run_client(client)?;

    server
        .join()
        .map_err(|_| CliError::new(INTERNAL, "demo server thread panicked"))?
        .map_err(|err| endpoint_error("demo server failed", err))?;

    print_report(&report, format);
    Ok(if report.passed { SUCCESS } else { DATA_INVALID })
}

fn echo_once(mut endpoint: Endpoint) -> Result<(), EndpointError> {
    let mut bytes = [0u8; BUFFER_CAPACITY];
    let n = endpoint.receive_bytes(&mut bytes)?;
    tracing::info!(size = n, "server received bytes");
    endpoint.send_bytes(&bytes[..n])?;

    let mut values = [0.0f64; BUFFER_CAPACITY];
    let (rows, cols) = endpoint.receive_matrix(&mut values)?;
    tracing::info!(rows, cols, "server received matrix");
    let len = rows as usize * cols as usize;
    endpoint.send_matrix(&values[..len], rows, cols)?;

    endpoint.close()
}

fn run_client(mut endpoint: Endpoint) -> CliResult<DemoReport> {
    let sent = Table::from_rows(&MATRIX)
        .map_err(|err| CliError::new(INTERNAL, format!("demo matrix invalid: {err}")))?;
    let server = endpoint.peer_addr().to_string();

    endpoint
        .send_bytes(GREETING)
        .map_err(|err| endpoint_error("send failed", err))?;
    let mut bytes = [0u8; BUFFER_CAPACITY];
    let n = endpoint
        .receive_bytes(&mut bytes)
        .map_err(|err| endpoint_error("receive failed", err))?;
    let echoed = &bytes[..n];

    endpoint
        .send_table(&sent)
        .map_err(|err| endpoint_error("send failed", err))?;
    let mut values = [0.0f64; BUFFER_CAPACITY];
    let (rows, cols) = endpoint
        .receive_matrix(&mut values)
        .map_err(|err| endpoint_error("receive failed", err))?;
    let received = &values[..rows as usize * cols as usize];

    endpoint
        .close()
        .map_err(|err| endpoint_error("close failed", err))?;

    let bytes_match = echoed == GREETING;
    let matrix_match = (rows, cols) == sent.shape() && bit_equal(received, sent.values());
    let matrix = Table::new(rows, cols, received.to_vec())
        .map(|table| table.to_rows())
        .unwrap_or_default();

    Ok(DemoReport {
        server,
        bytes_sent: String::from_utf8_lossy(GREETING).into_owned(),
        bytes_echoed: String::from_utf8_lossy(echoed).into_owned(),
        bytes_match,
        rows,
        cols,
        matrix,
        matrix_match,
        passed: bytes_match && matrix_match,
    })
}

fn bit_equal(left: &[f64], right: &[f64]) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .zip(right.iter())
            .all(|(a, b)| a.to_bits() == b.to_bits())
}

fn print_report(report: &DemoReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            let mut table = OutputTable::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CHECK", "SENT", "ECHOED", "RESULT"])
                .add_row(vec![
                    "bytes".to_string(),
                    report.bytes_sent.clone(),
                    report.bytes_echoed.clone(),
                    verdict(report.bytes_match).to_string(),
                ])
                .add_row(vec![
                    "matrix".to_string(),
                    "2x3".to_string(),
                    format!("{}x{}", report.rows, report.cols),
                    verdict(report.matrix_match).to_string(),
                ]);
            println!("{table}");
            println!("{}", matrix_table(&report.matrix));
        }
        OutputFormat::Pretty => {
            println!("server: {}", report.server);
            println!(
                "bytes: sent={:?} echoed={:?} {}",
                report.bytes_sent,
                report.bytes_echoed,
                verdict(report.bytes_match)
            );
            println!(
                "matrix: {}x{} {}",
                report.rows,
                report.cols,
                verdict(report.matrix_match)
            );
            for row in &report.matrix {
                println!("  {row:?}");
            }
        }
        OutputFormat::Raw => println!("{}", verdict(report.passed)),
    }
}

fn verdict(ok: bool) -> &'static str {
    if ok {
        "PASS"
    } else {
        "FAIL"
    }
}
