pub mod csv_export;
pub mod records;
pub mod sqlite;

pub use csv_export::CsvExporter;
pub use records::TableLayout;
pub use sqlite::SqliteSink;
