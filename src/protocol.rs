//! Line-delimited JSON requests and responses over a byte stream.

use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::tools::DocxTools;

#[derive(Debug, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub id: Value,
    pub tool: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Response {
    pub id: Value,
    pub result: String,
}

/// Answers one request line.
pub fn handle_line(tools: &DocxTools, line: &str) -> Response {
    match serde_json::from_str::<Request>(line) {
        Ok(request) => {
            debug!("Handling {} request", request.tool);
            let arguments = match request.arguments {
                Value::Null => Value::Object(Default::default()),
                other => other,
            };
            Response {
                result: tools.call(&request.tool, arguments),
                id: request.id,
            }
        }
        Err(err) => {
            warn!("Malformed request: {}", err);
            malformed(err)
        }
    }
}

fn malformed(reason: impl std::fmt::Display) -> Response {
    Response {
        id: Value::Null,
        result: format!("Error: Malformed request: {reason}"),
    }
}

/// Reads requests until end of input, writing one response line per
/// non-empty request line. A line that is not UTF-8 is answered as a
/// malformed request.
pub fn serve<R, W>(tools: &DocxTools, reader: R, mut writer: W) -> anyhow::Result<()>
where
    R: BufRead,
    W: Write,
{
    for line in reader.split(b'\n') {
        let response = match String::from_utf8(line?) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => handle_line(tools, &line),
            Err(err) => {
                warn!("Request line is not UTF-8: {}", err);
                malformed(err)
            }
        };
        serde_json::to_writer(&mut writer, &response)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    Ok(())
}
