// Status translation
//
// Maps an HTTP status plus the product's embedded status block onto a
// closed set of outcomes. Pure functions only; products decide how to read
// their own status block (see `Product::classify_vendor_status`).

use reqwest::StatusCode;

use crate::error::Error;

/// Well-known reason text for an HTTP status, as shown to users.
pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Not Authorized",
        403 => "Forbidden",
        404 => "Resource Not Found",
        405 => "Method Not Allowed",
        413 => "Request Entity Too Large",
        424 => "Failed Dependency",
        429 => "Access temporarily blocked",
        500 => "Internal Server Error",
        _ => "general API Error",
    }
}

/// The vendor's verdict, read from the status block embedded in a response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VendorStatus {
    /// The status block reports success.
    Ok,
    /// The session token is absent, expired, or revoked.
    SessionInvalid { code: i64, message: String },
    /// Any other business failure.
    Failed { code: i64, message: String },
}

/// Outcome category of a single request/response exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    AuthenticationRequired { message: String },
    NotFound,
    BadRequest,
    VendorError { code: i64, message: String },
    TransportError { status: u16 },
}

/// Classify an exchange from its HTTP status and optional vendor status block.
///
/// HTTP-level failures win over whatever the body says; the vendor block is
/// only consulted for 2xx responses.
pub fn classify(status: StatusCode, vendor: Option<VendorStatus>) -> Outcome {
    let code = status.as_u16();
    match code {
        401 => Outcome::AuthenticationRequired {
            message: format!("HTTP/401 {}", reason_phrase(401)),
        },
        404 => Outcome::NotFound,
        400 => Outcome::BadRequest,
        _ if !status.is_success() => Outcome::TransportError { status: code },
        _ => match vendor {
            None | Some(VendorStatus::Ok) => Outcome::Success,
            Some(VendorStatus::SessionInvalid { code, message }) => {
                Outcome::AuthenticationRequired {
                    message: format!("{message} (code: {code})"),
                }
            }
            Some(VendorStatus::Failed { code, message }) => Outcome::VendorError { code, message },
        },
    }
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Turn a non-success outcome into the matching [`Error`].
    pub fn into_result(self) -> Result<(), Error> {
        match self {
            Self::Success => Ok(()),
            Self::AuthenticationRequired { message } => {
                Err(Error::AuthenticationRequired { message })
            }
            Self::NotFound => Err(Error::NotFound),
            Self::BadRequest => Err(Error::BadRequest),
            Self::VendorError { code, message } => Err(Error::Vendor { code, message }),
            Self::TransportError { status } => Err(Error::Transport { status }),
        }
    }
}
