//! Fixed status code descriptions used as the envelope `message`

/// Message for codes missing from the table
pub const UNKNOWN_STATUS: &str = "Unknown status";

/// Description of a status code, if it is one we know
pub const fn describe(code: u16) -> Option<&'static str> {
    let description = match code {
        // Informational
        100 => "Continue",
        101 => "Switching Protocols",
        102 => "Processing",
        103 => "Early Hints",

        // Success
        200 => "Success",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        207 => "Multi-Status",
        208 => "Already Reported",
        226 => "IM Used",

        // Redirection
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        305 => "Use Proxy",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",

        // Client errors
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        409 => "Conflict",
        413 => "Payload Too Large",
        415 => "Unsupported Media Type",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",

        // Server errors
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",

        _ => return None,
    };
    Some(description)
}

/// Description of `code`, falling back to [`UNKNOWN_STATUS`]
pub const fn message_for(code: u16) -> &'static str {
    match describe(code) {
        Some(description) => description,
        None => UNKNOWN_STATUS,
    }
}
