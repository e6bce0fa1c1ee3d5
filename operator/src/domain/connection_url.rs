//! Connection URL retargeting.

/// Point `base_url` at `database`, keeping everything else verbatim.
///
/// The final path segment (between the last `/` and the query separator,
/// or the end of the string) is replaced. A query string is preserved
/// including its leading `?`. The input is always the administrative base
/// URL, so repeated application is not a concern.
///
/// # Examples
/// ```
/// use operator::domain::retarget_database;
///
/// assert_eq!(
///     retarget_database("jdbc:postgresql://localhost:32769/quarkus?loggerLevel=OFF", "12345"),
///     "jdbc:postgresql://localhost:32769/12345?loggerLevel=OFF"
/// );
/// ```
pub fn retarget_database(base_url: &str, database: &str) -> String {
    let (location, query) = match base_url.rfind('?') {
        Some(index) => base_url.split_at(index),
        None => (base_url, ""),
    };
    let prefix = match location.rfind('/') {
        Some(index) => location.split_at(index + 1).0,
        None => "",
    };

    let mut url = String::with_capacity(prefix.len() + database.len() + query.len());
    url.push_str(prefix);
    url.push_str(database);
    url.push_str(query);
    url
}
