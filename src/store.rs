use crate::record::{DetailRecord, Record, SummaryRecord};

/// The records of a receipt file in the order they appear in the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordStore {
    records: Vec<Record>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// The summary records, in file order.
    pub fn summaries(&self) -> impl Iterator<Item = &SummaryRecord> {
        self.records.iter().filter_map(|record| match record {
            Record::Summary(summary) => Some(summary),
            Record::Detail(_) => None,
        })
    }

    /// The detail records, in file order.
    pub fn details(&self) -> impl Iterator<Item = &DetailRecord> {
        self.records.iter().filter_map(|record| match record {
            Record::Detail(detail) => Some(detail),
            Record::Summary(_) => None,
        })
    }
}

impl FromIterator<Record> for RecordStore {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        RecordStore {
            records: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a RecordStore {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
