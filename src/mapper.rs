//! Turns the raw `curl` command arguments into a validated [`CurlRequest`].

use crate::http::SUPPORTED_METHODS;
use ::http::Method;
use serde::de::IgnoredAny;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

const HEADER_SEPARATOR: char = ':';
const MULTIPLE_HEADER_SEPARATOR: char = ';';
const QUERY_PARAM_SEPARATOR: &str = "&";
const FILE_NAME_IDENTIFIER: char = '@';
const PRETTY_QUERY_PARAMETER: &str = "pretty=true";

#[derive(Debug, Error)]
pub enum MapperError {
    #[error("action cannot be empty")]
    EmptyAction,
    #[error("action: {action} is not supported. Supported values are: [{supported}]")]
    UnsupportedAction { action: String, supported: String },
    #[error("invalid header format, received {0} but expected is 'name: value'")]
    InvalidHeader(String),
    #[error("invalid data: {0}, data can be either valid json or filename with prefix '@'")]
    InvalidData(String),
    #[error("failed to read data file '{}': {source}", path.display())]
    DataFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// `curl` arguments exactly as the user typed them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurlCommandRequest {
    pub action: String,
    pub path: String,
    pub query_params: String,
    pub headers: String,
    pub data: String,
    pub pretty: bool,
    pub output_format: String,
    pub output_filter_path: String,
}

/// A request ready to be sent through the platform gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurlRequest {
    pub action: Method,
    pub path: String,
    pub query_params: String,
    pub headers: HashMap<String, String>,
    pub data: Option<Vec<u8>>,
}

fn non_blank(input: &str) -> Option<&str> {
    let trimmed = input.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Validates and converts user input.
///
/// Nothing is sent; the only I/O is reading an `@file` payload.
pub fn map(request: CurlCommandRequest) -> Result<CurlRequest, MapperError> {
    let action = to_action(&request.action)?;
    let headers = to_headers(&request.headers)?;
    let data = to_payload(&request.data)?;
    let path = if non_blank(&request.path).is_some() {
        request.path
    } else {
        String::new()
    };

    let mut additional = Vec::new();
    if request.pretty {
        additional.push(PRETTY_QUERY_PARAMETER.to_string());
    }
    if let Some(format) = non_blank(&request.output_format) {
        additional.push(format!("format={format}"));
    }
    if let Some(filter_path) = non_blank(&request.output_filter_path) {
        additional.push(format!("filter_path={filter_path}"));
    }
    let query_params = if additional.is_empty() {
        request.query_params
    } else {
        append_query_parameters(&request.query_params, &additional)
    };

    Ok(CurlRequest {
        action,
        path,
        query_params,
        headers,
        data,
    })
}

/// Joins onto the user's query with `&` even when it is empty, so an empty
/// query yields a leading separator (`&pretty=true`). Servers accept it and
/// existing scripts depend on the exact string.
fn append_query_parameters(query: &str, parameters: &[String]) -> String {
    query
        .split(QUERY_PARAM_SEPARATOR)
        .chain(parameters.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(QUERY_PARAM_SEPARATOR)
}

fn to_action(action: &str) -> Result<Method, MapperError> {
    let verb = non_blank(action).ok_or(MapperError::EmptyAction)?;
    let upper = verb.to_uppercase();
    SUPPORTED_METHODS
        .iter()
        .find(|method| method.as_str() == upper)
        .cloned()
        .ok_or_else(|| MapperError::UnsupportedAction {
            action: action.to_string(),
            supported: SUPPORTED_METHODS
                .iter()
                .map(Method::as_str)
                .collect::<Vec<_>>()
                .join(" "),
        })
}

fn to_headers(headers: &str) -> Result<HashMap<String, String>, MapperError> {
    let mut parsed = HashMap::new();
    let Some(headers) = non_blank(headers) else {
        return Ok(parsed);
    };
    for header in headers.split(MULTIPLE_HEADER_SEPARATOR) {
        if non_blank(header).is_none() {
            continue;
        }
        let parts: Vec<&str> = header.split(HEADER_SEPARATOR).collect();
        let [name, value] = parts.as_slice() else {
            return Err(MapperError::InvalidHeader(header.to_string()));
        };
        let name = name.trim().to_lowercase();
        let value = value.trim().to_lowercase();
        if !name.is_empty() && !value.is_empty() {
            parsed.insert(name, value);
        }
    }
    Ok(parsed)
}

fn to_payload(data: &str) -> Result<Option<Vec<u8>>, MapperError> {
    if non_blank(data).is_none() {
        return Ok(None);
    }
    if let Some(file) = data.strip_prefix(FILE_NAME_IDENTIFIER) {
        if non_blank(file).is_some() {
            let path = PathBuf::from(file);
            return fs::read(&path)
                .map(Some)
                .map_err(|source| MapperError::DataFile { path, source });
        }
    }
    if serde_json::from_str::<IgnoredAny>(data).is_err() {
        return Err(MapperError::InvalidData(data.to_string()));
    }
    Ok(Some(data.as_bytes().to_vec()))
}
