pub mod cell;
pub mod dep_graph;
pub mod error;
pub mod formula;
pub mod position;
pub mod sheet;
pub mod value;

pub use cell::{Cell, CellContent};
pub use error::{ParsePositionError, SheetError};
pub use position::{Limits, Position, Size};
pub use sheet::Sheet;
pub use value::{ErrorKind, Value};
