use a2a_types::{JSONRPCRequest, JSONRPC_VERSION};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};

/// Parses and validates a raw JSON-RPC request body.
///
/// Malformed JSON is a parse error; well-formed JSON that is not a request
/// object, or that names another protocol version, is an invalid request.
pub fn parse_request(body: &[u8]) -> Result<JSONRPCRequest> {
    let value: Value = serde_json::from_slice(body)?;
    let request: JSONRPCRequest =
        serde_json::from_value(value).map_err(|e| Error::InvalidRequest(e.to_string()))?;
    validate_request(&request)?;
    Ok(request)
}

/// Helper function to validate JSON-RPC request
pub fn validate_request(req: &JSONRPCRequest) -> Result<()> {
    if req.jsonrpc != JSONRPC_VERSION {
        return Err(Error::InvalidRequest(
            "Invalid JSON-RPC version".to_string(),
        ));
    }
    Ok(())
}

/// Deserializes the `params` member into the method's parameter type.
pub fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T> {
    let params = params.ok_or_else(|| Error::InvalidParams("Missing params".to_string()))?;
    serde_json::from_value(params).map_err(|e| Error::InvalidParams(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use a2a_types::TaskQueryParams;

    #[test]
    fn rejects_malformed_and_foreign_requests() {
        assert!(matches!(parse_request(b"{not json"), Err(Error::Json(_))));
        assert!(matches!(
            parse_request(br#"{"jsonrpc":"1.0","method":"tasks/get","id":1}"#),
            Err(Error::InvalidRequest(_))
        ));
        assert!(matches!(
            parse_request(br#"[1, 2]"#),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn params_are_typed() {
        let request = parse_request(
            br#"{"jsonrpc":"2.0","method":"tasks/get","id":"r1","params":{"id":"t1","historyLength":2}}"#,
        )
        .unwrap();
        let params: TaskQueryParams = parse_params(request.params).unwrap();
        assert_eq!(params.id, "t1");
        assert_eq!(params.history_length, Some(2));

        assert!(matches!(
            parse_params::<TaskQueryParams>(None),
            Err(Error::InvalidParams(_))
        ));
    }
}
