//! Identifier and type transforms exposed to template authors as filters.
//!
//! Every function here is total: any input string produces an output, so a
//! template can never fail because of a filter.

/// Ordered SQL type rules. The first rule whose needle occurs in the
/// upper-cased SQL type wins, so `BIGINT` must stay ahead of `INT` and
/// `DATETIME` ahead of `DATE` and `TIME`.
const SQL_TYPE_RULES: &[(&[&str], &str)] = &[
    (&["BIGINT"], "Long"),
    (&["INT", "INTEGER"], "Integer"),
    (&["CHAR", "TEXT", "STRING"], "String"),
    (&["DATETIME", "TIMESTAMP"], "LocalDateTime"),
    (&["DATE"], "LocalDate"),
    (&["TIME"], "LocalTime"),
    (&["DECIMAL", "NUMERIC"], "BigDecimal"),
    (&["DOUBLE"], "Double"),
    (&["FLOAT"], "Float"),
    (&["BOOL", "BIT"], "Boolean"),
    (&["BLOB", "BINARY"], "byte[]"),
];

const DEFAULT_TARGET_TYPE: &str = "String";

/// A segment written entirely in upper case (`USER`, `ID`) is treated as a
/// whole word and lower-cased before its first letter is adjusted.
fn normalize_word(segment: &str) -> String {
    let has_lower = segment.chars().any(char::is_lowercase);
    let has_upper = segment.chars().any(char::is_uppercase);
    if has_upper && !has_lower {
        segment.to_lowercase()
    } else {
        segment.to_string()
    }
}

/// Upper-case every letter that starts the segment or follows a non-letter
/// (`user1name` -> `User1Name`); other letters keep their case.
fn title_case(segment: &str) -> String {
    let word = normalize_word(segment);
    let mut out = String::with_capacity(word.len());
    let mut after_letter = false;
    for c in word.chars() {
        if c.is_alphabetic() && !after_letter {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        after_letter = c.is_alphabetic();
    }
    out
}

fn lower_first(segment: &str) -> String {
    let word = normalize_word(segment);
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Convert `user_name` to `userName`.
///
/// Splits on `_` only; the first segment is lower-cased and the remaining
/// segments are title-cased.
pub fn to_camel_case(s: &str) -> String {
    let mut parts = s.split('_');
    let head = parts.next().map(lower_first).unwrap_or_default();
    parts.fold(head, |mut acc, part| {
        acc.push_str(&title_case(part));
        acc
    })
}

/// Convert `user_name` or `user-name` to `UserName`.
pub fn to_pascal_case(s: &str) -> String {
    s.split(['_', '-']).map(title_case).collect()
}

/// Convert `UserTable`, `userTable` or `user_table` to `user-table`.
pub fn to_kebab_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            out.push('-');
        }
        out.push(c.to_ascii_lowercase());
    }
    out.replace('_', "-")
}

/// Map a source column type (`VARCHAR(50)`, `bigint unsigned`, ...) to a
/// target-language type name. Unknown types map to `String`.
pub fn sql_type_to_target_type(sql_type: &str) -> &'static str {
    let upper = sql_type.to_uppercase();
    SQL_TYPE_RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|needle| upper.contains(needle)))
        .map(|(_, target)| *target)
        .unwrap_or(DEFAULT_TARGET_TYPE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_camel_case() {
        assert_eq!(to_camel_case("user_name"), "userName");
        assert_eq!(to_camel_case("id"), "id");
        assert_eq!(to_camel_case("created_at_utc"), "createdAtUtc");
        assert_eq!(to_camel_case("USER_NAME"), "userName");
        assert_eq!(to_camel_case(""), "");
    }

    #[test]
    fn test_to_camel_case_is_idempotent() {
        for input in ["user_name", "order_line_item", "id"] {
            let once = to_camel_case(input);
            assert_eq!(to_camel_case(&once), once);
        }
    }

    #[test]
    fn test_to_pascal_case() {
        assert_eq!(to_pascal_case("user_name"), "UserName");
        assert_eq!(to_pascal_case("user-name"), "UserName");
        assert_eq!(to_pascal_case("user"), "User");
        assert_eq!(to_pascal_case("_leading"), "Leading");
        assert_eq!(to_pascal_case(""), "");
        assert_eq!(to_pascal_case("UserName"), "UserName");
    }

    #[test]
    fn test_letters_after_digits_start_a_word() {
        assert_eq!(to_pascal_case("user1name"), "User1Name");
        assert_eq!(to_pascal_case("address_2nd_line"), "Address2NdLine");
        assert_eq!(to_camel_case("order_item1x"), "orderItem1X");
        assert_eq!(to_pascal_case("v2"), "V2");
        assert_eq!(to_pascal_case(&to_pascal_case("user1name")), "User1Name");
    }

    #[test]
    fn test_to_kebab_case() {
        assert_eq!(to_kebab_case("UserTable"), "user-table");
        assert_eq!(to_kebab_case("userTable"), "user-table");
        assert_eq!(to_kebab_case("user_table"), "user-table");
        assert_eq!(to_kebab_case("user-table"), "user-table");
        assert_eq!(to_kebab_case(""), "");
    }

    #[test]
    fn test_kebab_of_pascal_round_trips() {
        for input in ["user_name", "order_line_item", "account"] {
            assert_eq!(to_kebab_case(&to_pascal_case(input)), to_kebab_case(input));
        }
    }

    #[test]
    fn test_sql_type_precedence() {
        assert_eq!(sql_type_to_target_type("BIGINT UNSIGNED"), "Long");
        assert_eq!(sql_type_to_target_type("bigint"), "Long");
        assert_eq!(sql_type_to_target_type("INT(11)"), "Integer");
        assert_eq!(sql_type_to_target_type("VARCHAR(50)"), "String");
        assert_eq!(sql_type_to_target_type("DATETIME"), "LocalDateTime");
        assert_eq!(sql_type_to_target_type("timestamp with time zone"), "LocalDateTime");
        assert_eq!(sql_type_to_target_type("DATE"), "LocalDate");
        assert_eq!(sql_type_to_target_type("TIME"), "LocalTime");
        assert_eq!(sql_type_to_target_type("DECIMAL(10,2)"), "BigDecimal");
        assert_eq!(sql_type_to_target_type("DOUBLE PRECISION"), "Double");
        assert_eq!(sql_type_to_target_type("FLOAT"), "Float");
        assert_eq!(sql_type_to_target_type("BOOLEAN"), "Boolean");
        assert_eq!(sql_type_to_target_type("BIT(1)"), "Boolean");
        assert_eq!(sql_type_to_target_type("LONGBLOB"), "byte[]");
        assert_eq!(sql_type_to_target_type("JSON"), "String");
        assert_eq!(sql_type_to_target_type(""), "String");
    }
}
