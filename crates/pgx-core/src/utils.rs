//! 通用工具函数

/// 规范化药物名称：去除首尾空白并转为大写
pub fn normalize_token(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// 将药物列表拼接为表单字段值，忽略空项，首尾不留逗号
pub fn join_drugs<S: AsRef<str>>(drugs: &[S]) -> String {
    drugs
        .iter()
        .map(|d| d.as_ref().trim())
        .filter(|d| !d.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

/// 大小写不敏感的后缀匹配
pub fn ends_with_ignore_case(name: &str, suffix: &str) -> bool {
    name.to_lowercase().ends_with(&suffix.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_token() {
        assert_eq!(normalize_token("  warfarin \n"), "WARFARIN");
        assert_eq!(normalize_token("   "), "");
    }

    #[test]
    fn test_join_drugs() {
        assert_eq!(join_drugs(&["CODEINE", "WARFARIN"]), "CODEINE,WARFARIN");
        assert_eq!(join_drugs(&["", "CODEINE", " "]), "CODEINE");
        assert_eq!(join_drugs::<&str>(&[]), "");
    }

    #[test]
    fn test_ends_with_ignore_case() {
        assert!(ends_with_ignore_case("Sample.VCF", ".vcf"));
        assert!(!ends_with_ignore_case("sample.vcf.gz", ".vcf"));
    }
}
