//! 服务端错误响应解析

use serde_json::Value;

/// 从非2xx响应体中提取可展示的错误原因
///
/// `detail` 可能是字符串，也可能是参数校验错误列表（取每项的 `msg`）。
/// 没有 `detail` 时退而使用 `errors` 数组。
pub fn extract_detail(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;

    let from_detail = match value.get("detail") {
        Some(Value::String(detail)) => Some(detail.clone()),
        Some(Value::Array(items)) => join_messages(items),
        Some(Value::Object(obj)) => obj.get("msg").and_then(Value::as_str).map(str::to_string),
        _ => None,
    };

    from_detail
        .or_else(|| match value.get("errors") {
            Some(Value::Array(items)) => join_messages(items),
            _ => None,
        })
        .filter(|message| !message.trim().is_empty())
}

fn join_messages(items: &[Value]) -> Option<String> {
    let messages: Vec<&str> = items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.as_str()),
            Value::Object(obj) => obj.get("msg").and_then(Value::as_str),
            _ => None,
        })
        .filter(|s| !s.trim().is_empty())
        .collect();

    if messages.is_empty() {
        None
    } else {
        Some(messages.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_detail() {
        let body = br#"{"detail": "VCF file exceeds 5 MB limit."}"#;
        assert_eq!(extract_detail(body).as_deref(), Some("VCF file exceeds 5 MB limit."));
    }

    #[test]
    fn test_validation_list_detail() {
        let body = br#"{"detail": [
            {"loc": ["body", "drugs"], "msg": "field required", "type": "value_error.missing"},
            {"loc": ["body", "vcf_file"], "msg": "file required", "type": "value_error.missing"}
        ]}"#;
        assert_eq!(extract_detail(body).as_deref(), Some("field required; file required"));
    }

    #[test]
    fn test_errors_fallback() {
        let body = br#"{"status": "error", "errors": ["first", "second"]}"#;
        assert_eq!(extract_detail(body).as_deref(), Some("first; second"));
    }

    #[test]
    fn test_unusable_bodies() {
        assert_eq!(extract_detail(b"<html>Bad Gateway</html>"), None);
        assert_eq!(extract_detail(br#"{"detail": ""}"#), None);
        assert_eq!(extract_detail(br#"{"message": "nope"}"#), None);
    }
}
