//! Precondition checks applied before any user handler runs.

use crate::context::RequestContext;
use crate::error::{AdapterError, AdapterResult, ContextFailure};
use crate::types::{
    CallToolParams, CallToolRequest, GetPromptParams, GetPromptRequest, ReadResourceParams,
    ReadResourceRequest,
};

/// Reject an absent or already-cancelled context.
pub fn validate_context(ctx: Option<&RequestContext>) -> AdapterResult<&RequestContext> {
    let ctx = ctx.ok_or(AdapterError::Context(ContextFailure::Missing))?;
    if ctx.is_cancelled() {
        return Err(AdapterError::Context(ContextFailure::Cancelled));
    }
    Ok(ctx)
}

pub fn validate_tool_request(req: Option<&CallToolRequest>) -> AdapterResult<&CallToolParams> {
    let params = req
        .ok_or_else(|| AdapterError::request_shape("tool call request is missing"))?
        .params
        .as_ref()
        .ok_or_else(|| AdapterError::request_shape("tool call params are missing"))?;
    if params.name.is_empty() {
        return Err(AdapterError::request_shape("tool name must not be empty"));
    }
    Ok(params)
}

pub fn validate_prompt_request(
    req: Option<&GetPromptRequest>,
) -> AdapterResult<&GetPromptParams> {
    let params = req
        .ok_or_else(|| AdapterError::request_shape("prompt request is missing"))?
        .params
        .as_ref()
        .ok_or_else(|| AdapterError::request_shape("prompt params are missing"))?;
    if params.name.is_empty() {
        return Err(AdapterError::request_shape("prompt name must not be empty"));
    }
    Ok(params)
}

pub fn validate_resource_request(
    req: Option<&ReadResourceRequest>,
) -> AdapterResult<&ReadResourceParams> {
    let params = req
        .ok_or_else(|| AdapterError::request_shape("resource request is missing"))?
        .params
        .as_ref()
        .ok_or_else(|| AdapterError::request_shape("resource params are missing"))?;
    if params.uri.is_empty() {
        return Err(AdapterError::request_shape("resource URI must not be empty"));
    }
    Ok(params)
}

/// Setup-time check for names, descriptions and URIs.
pub fn validate_identifier(field: &str, value: &str) -> AdapterResult<()> {
    if value.trim().is_empty() {
        return Err(AdapterError::registration(format!(
            "{field} must not be empty"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_context() {
        let err = validate_context(None).unwrap_err();
        assert!(matches!(
            err,
            AdapterError::Context(ContextFailure::Missing)
        ));
    }

    #[test]
    fn test_cancelled_context() {
        let ctx = RequestContext::new();
        ctx.cancel();
        assert!(validate_context(Some(&ctx)).unwrap_err().is_cancelled());
    }

    #[test]
    fn test_live_context() {
        let ctx = RequestContext::new();
        assert!(validate_context(Some(&ctx)).is_ok());
    }

    #[test]
    fn test_tool_request_shapes() {
        assert!(matches!(
            validate_tool_request(None),
            Err(AdapterError::RequestShape(_))
        ));
        assert!(matches!(
            validate_tool_request(Some(&CallToolRequest::default())),
            Err(AdapterError::RequestShape(_))
        ));
        assert!(matches!(
            validate_tool_request(Some(&CallToolRequest::new("", None))),
            Err(AdapterError::RequestShape(_))
        ));
        let req = CallToolRequest::new("echo", None);
        assert_eq!(validate_tool_request(Some(&req)).unwrap().name, "echo");
    }

    #[test]
    fn test_prompt_request_shapes() {
        assert!(validate_prompt_request(None).is_err());
        assert!(validate_prompt_request(Some(&GetPromptRequest::default())).is_err());
        let req = GetPromptRequest::new("greeting", None);
        assert!(validate_prompt_request(Some(&req)).is_ok());
    }

    #[test]
    fn test_resource_request_requires_uri() {
        assert!(validate_resource_request(None).is_err());
        assert!(validate_resource_request(Some(&ReadResourceRequest::default())).is_err());
        let empty = ReadResourceRequest::new("");
        let err = validate_resource_request(Some(&empty)).unwrap_err();
        assert_eq!(err.to_string(), "Invalid request: resource URI must not be empty");
        let ok = ReadResourceRequest::new("info://server");
        assert_eq!(validate_resource_request(Some(&ok)).unwrap().uri, "info://server");
    }

    #[test]
    fn test_identifier() {
        assert!(validate_identifier("tool name", "echo").is_ok());
        assert!(matches!(
            validate_identifier("tool name", "  "),
            Err(AdapterError::Registration(_))
        ));
    }
}
