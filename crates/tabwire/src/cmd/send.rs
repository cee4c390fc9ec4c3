use std::fs;

use tabwire_endpoint::{create_client_with_config, EndpointConfig};
use tabwire_frame::{Frame, Table};

use crate::cmd::{parse_duration, SendArgs};
use crate::exit::{endpoint_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let connect_timeout = parse_duration(&args.connect_timeout)?;
    let frame = resolve_frame(&args)?;

    let config = EndpointConfig::default()
        .with_connect_timeout(Some(connect_timeout))
        .with_read_timeout(args.wait.then_some(wait_timeout));
    let mut endpoint = create_client_with_config(&args.addr, config)
        .map_err(|err| endpoint_error("connect failed", err))?;

    endpoint
        .send_frame(&frame)
        .map_err(|err| endpoint_error("send failed", err))?;
    tracing::debug!(kind = %frame.kind(), size = frame.payload_len(), "sent frame");

    if args.wait {
        let response = endpoint
            .recv_frame()
            .map_err(|err| endpoint_error("receive failed", err))?;
        print_frame(&response, endpoint.peer_addr(), format);
    }

    endpoint
        .close()
        .map_err(|err| endpoint_error("close failed", err))?;
    Ok(SUCCESS)
}

fn resolve_frame(args: &SendArgs) -> CliResult<Frame> {
    if let Some(matrix) = &args.matrix {
        return parse_matrix(matrix).map(Frame::Table);
    }
    if let Some(data) = &args.data {
        return Ok(Frame::raw(data.clone().into_bytes()));
    }
    if let Some(path) = &args.file {
        let bytes = fs::read(path).map_err(|err| {
            crate::exit::io_error(&format!("failed reading {}", path.display()), err)
        })?;
        return Ok(Frame::raw(bytes));
    }
    Ok(Frame::raw(Vec::new()))
}

pub(crate) fn parse_matrix(input: &str) -> CliResult<Table> {
    let rows: Vec<Vec<f64>> = serde_json::from_str(input).map_err(|err| {
        CliError::new(
            USAGE,
            format!("--matrix must be a JSON array of number arrays: {err}"),
        )
    })?;
    Table::from_rows(&rows)
        .map_err(|err| CliError::new(USAGE, format!("--matrix must be rectangular: {err}")))
}
