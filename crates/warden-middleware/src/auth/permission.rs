//! 权限字符串匹配
//!
//! 权限字符串的形式为 `ACTION|RESOURCE`（如 `R|user`）或单独的 `ACTION`。
//! `*|*` 为管理员通配权限。
use std::collections::BTreeSet;

/// 管理员通配权限
pub const ADMIN_WILDCARD: &str = "*|*";

/// 动作与资源之间的分隔符
pub const PERMISSION_SEPARATOR: char = '|';

/// 拆分菜单上逗号分隔的 `perms` 字段，去除空白和空项
pub fn split_permissions(raw: Option<&str>) -> Vec<String> {
    raw.map(|perms| {
        perms
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// 判断持有的权限集合是否满足所需权限
///
/// 1. 持有通配权限时直接放行
/// 2. 持有与所需权限完全相同的字符串时放行
/// 3. 所需权限本身已是复合形式（含 `|`）时不再扩展
/// 4. 否则用调用方提供的 `subtype` 拼出 `required|subtype` 再检查
pub fn satisfies(held: &BTreeSet<String>, required: &str, subtype: Option<&str>) -> bool {
    if held.contains(ADMIN_WILDCARD) {
        return true;
    }

    let required = required.trim();
    if held.contains(required) {
        return true;
    }

    if required.contains(PERMISSION_SEPARATOR) {
        return false;
    }

    match subtype.map(str::trim).filter(|s| !s.is_empty()) {
        Some(subtype) => held.contains(&format!("{required}{PERMISSION_SEPARATOR}{subtype}")),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_wildcard_grants_everything() {
        let held = set(&[ADMIN_WILDCARD]);
        for required in ["R|user", "C", "D|menu", "anything"] {
            assert!(satisfies(&held, required, None));
            assert!(satisfies(&held, required, Some("role")));
        }
    }

    #[test]
    fn test_exact_and_widened_matches() {
        let held = set(&["R|role"]);
        assert!(satisfies(&held, "R|role", None));
        assert!(satisfies(&held, "R", Some("role")));
        assert!(!satisfies(&held, "R", Some("menu")));
        assert!(!satisfies(&held, "R", None));
        assert!(!satisfies(&held, "R", Some("  ")));
    }

    #[test]
    fn test_compound_required_is_never_widened() {
        let held = set(&["R|menu"]);
        assert!(!satisfies(&held, "C|menu", None));

        let held = set(&["R|user|admin"]);
        assert!(!satisfies(&held, "R|user", Some("admin")));
    }

    #[test]
    fn test_required_and_subtype_are_trimmed() {
        let held = set(&["U|escalation"]);
        assert!(satisfies(&held, " U|escalation ", None));
        assert!(satisfies(&held, "U", Some(" escalation")));
    }

    #[test]
    fn test_split_permissions() {
        assert_eq!(
            split_permissions(Some(" R|user, C|user,,  ,D|user ")),
            vec!["R|user", "C|user", "D|user"]
        );
        assert_eq!(split_permissions(Some("*|*")), vec!["*|*"]);
        assert!(split_permissions(Some("")).is_empty());
        assert!(split_permissions(None).is_empty());
    }
}
