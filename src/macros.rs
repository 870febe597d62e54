//===========================================================================//

macro_rules! data_error {
    ($e:expr) => {
        return Err($crate::error::BmpError::DataError(($e).to_string()))
    };
    ($fmt:expr, $($arg:tt)+) => {
        return Err($crate::error::BmpError::DataError(
            format!($fmt, $($arg)+)))
    };
}

macro_rules! insufficient_data {
    ($e:expr) => {
        return Err($crate::error::BmpError::InsufficientData(
            ($e).to_string()))
    };
    ($fmt:expr, $($arg:tt)+) => {
        return Err($crate::error::BmpError::InsufficientData(
            format!($fmt, $($arg)+)))
    };
}

macro_rules! invalid_header {
    ($e:expr) => {
        return Err($crate::error::BmpError::InvalidHeader(($e).to_string()))
    };
    ($fmt:expr, $($arg:tt)+) => {
        return Err($crate::error::BmpError::InvalidHeader(
            format!($fmt, $($arg)+)))
    };
}

//===========================================================================//
