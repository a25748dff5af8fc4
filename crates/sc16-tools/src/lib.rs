pub mod model;

pub use model::{load_data, load_program, read_source, symbol_list, SymbolKV};
