/// Process exit codes returned by every subcommand
pub const SUCCESS: i32 = 0;
/// Bad arguments, missing or malformed recording files, invalid plan
pub const INPUT_ERROR: i32 = 1;
/// Output could not be serialized or written
pub const EXECUTION_ERROR: i32 = 2;
/// Detection, section or cycle analysis rejected the request
pub const ANALYSIS_ERROR: i32 = 3;
