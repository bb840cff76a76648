//! Wire types shared by the NDNS server, resolver, and management tool:
//! names, the zone/rrset data model, and the rrset content codec.

pub mod data;
mod error;
pub mod name;
pub mod response;
pub mod tlv;

pub use data::{Rrset, RrsetId, Zone, ZoneId};
pub use error::Error;
pub use name::{
    match_against_zone, match_data_against_zone, Component, MatchError, MatchResult, Name,
    NameFromStrError, QueryKind, RecordType, RecordTypeFromStrError,
};
pub use response::{Content, ContentType, Response, SubRecord, UpdateReturnCode};
