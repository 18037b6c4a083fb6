/// `Rollback` is the compensating action captured before an outbound side effect
///
/// - `Delete` used when the record was created by the same operation
/// - `Restore` holds the pre-transition snapshot of a record that already existed
#[derive(Debug, Clone, PartialEq)]
pub enum Rollback<T> {
    Delete(T),
    Restore(T),
}
