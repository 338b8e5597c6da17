//! Input validation and escaping shared by the sfq API crates.
//!
//! ## SOQL Injection Prevention
//!
//! User-provided values placed inside SOQL string literals must be escaped:
//!
//! ```rust
//! use sfq_client::security::soql;
//!
//! let name = soql::escape_string("O'Brien");
//! let query = format!("SELECT Id FROM Account WHERE Name = '{}'", name);
//! assert_eq!(query, "SELECT Id FROM Account WHERE Name = 'O\\'Brien'");
//! ```

/// SOQL escaping and identifier rules.
pub mod soql {
    /// Escape a string value for use in a SOQL string literal.
    ///
    /// - Single quotes (`'`) become `\'`
    /// - Backslashes (`\`) become `\\`
    /// - Newlines, carriage returns and tabs become `\n`, `\r`, `\t`
    ///
    /// ```rust
    /// use sfq_client::security::soql;
    ///
    /// assert_eq!(soql::escape_string("O'Brien & Co."), "O\\'Brien & Co.");
    /// ```
    #[must_use]
    pub fn escape_string(value: &str) -> String {
        let mut escaped = String::with_capacity(value.len() + 16);
        for ch in value.chars() {
            match ch {
                '\'' => escaped.push_str("\\'"),
                '\\' => escaped.push_str("\\\\"),
                '\n' => escaped.push_str("\\n"),
                '\r' => escaped.push_str("\\r"),
                '\t' => escaped.push_str("\\t"),
                _ => escaped.push(ch),
            }
        }
        escaped
    }

    /// Escape a value for use in a SOQL LIKE clause. Also escapes the `%`
    /// and `_` wildcards.
    #[must_use]
    pub fn escape_like(value: &str) -> String {
        let base_escaped = escape_string(value);
        let mut escaped = String::with_capacity(base_escaped.len() + 8);
        for ch in base_escaped.chars() {
            match ch {
                '%' => escaped.push_str("\\%"),
                '_' => escaped.push_str("\\_"),
                _ => escaped.push(ch),
            }
        }
        escaped
    }

    /// Returns true if `name` matches `[A-Za-z][A-Za-z0-9_]*`.
    ///
    /// This is the platform's rule for sObject names, field names and
    /// composite reference ids.
    ///
    /// ```rust
    /// use sfq_client::security::soql;
    ///
    /// assert!(soql::is_safe_identifier("Custom_Object__c"));
    /// assert!(soql::is_safe_identifier("accounts2"));
    /// assert!(!soql::is_safe_identifier("2accounts"));
    /// assert!(!soql::is_safe_identifier("Bad'; DROP--"));
    /// ```
    #[must_use]
    pub fn is_safe_identifier(name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(first) if first.is_ascii_alphabetic() => {
                chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
            }
            _ => false,
        }
    }
}

/// Record id rules.
pub mod ids {
    /// Validate that a Salesforce ID has the correct format: 15 or 18
    /// alphanumeric characters.
    ///
    /// ```rust
    /// use sfq_client::security::ids;
    ///
    /// assert!(ids::is_valid_salesforce_id("001000000000001"));
    /// assert!(ids::is_valid_salesforce_id("001000000000001AAA"));
    /// assert!(!ids::is_valid_salesforce_id("invalid"));
    /// assert!(!ids::is_valid_salesforce_id("001/../../etc"));
    /// ```
    #[must_use]
    pub fn is_valid_salesforce_id(id: &str) -> bool {
        let len = id.len();
        (len == 15 || len == 18) && id.chars().all(|c| c.is_ascii_alphanumeric())
    }
}
