use core::num::ParseIntError;

use flex_error::{define_error, TraceError};

define_error! {
    #[derive(Debug, PartialEq, Eq)]
    Error {
        InvalidHeight
            { value: String }
            | e | { format_args!("invalid height {0}: expected `<revision_number>-<revision_height>`", e.value) },

        InvalidHeightNumber
            { value: String }
            [ TraceError<ParseIntError> ]
            | e | { format_args!("height {0} contains an invalid number", e.value) },
    }
}
