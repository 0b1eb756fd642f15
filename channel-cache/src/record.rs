/// A single channel row as loaded from the record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: i32,
    pub serial: String,
}

impl Record {
    pub fn new(id: i32, serial: impl Into<String>) -> Self {
        Self {
            id,
            serial: serial.into(),
        }
    }
}
