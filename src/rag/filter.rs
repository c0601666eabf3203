//! OData filters restricting retrieval to selected documents.

/// Field the indexer fills with the blob name.
pub const TITLE_FIELD: &str = "title";

/// Escape a value for use inside an OData string literal.
pub fn odata_escape(value: &str) -> String {
    value.replace('\'', "''")
}

/// Build a filter matching any of the selected file names.
///
/// Empty names are dropped. Returns `None` when nothing is left, which means
/// the query runs over the whole index. Input order is preserved.
pub fn build_filter<I, S>(selection: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let clauses: Vec<String> = selection
        .into_iter()
        .filter(|name| !name.as_ref().is_empty())
        .map(|name| format!("{} eq '{}'", TITLE_FIELD, odata_escape(name.as_ref())))
        .collect();

    match clauses.len() {
        0 => None,
        1 => clauses.into_iter().next(),
        _ => Some(format!("({})", clauses.join(" or "))),
    }
}
