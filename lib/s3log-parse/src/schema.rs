//! Operation-type registry, positional field schema, and the object-key handler
//! abstraction (component C7).

use std::collections::HashSet;
use std::sync::OnceLock;

/// Positional field names of a raw S3 access-log line, in order. Fixed by the
/// S3 server-access-log format; used only for documentation and tests, since
/// the hot-path parsers address fields by index.
pub const RAW_FIELD_NAMES: [&str; 25] = [
    "bucket_owner",
    "bucket",
    "timestamp",
    "ip_address",
    "requester",
    "request_id",
    "operation",
    "object_key",
    "request_uri",
    "http_status_code",
    "error_code",
    "bytes_sent",
    "object_size",
    "total_time",
    "turn_around_time",
    "referrer",
    "user_agent",
    "version_id",
    "host_id",
    "sigv",
    "cipher_suite",
    "auth_type",
    "endpoint",
    "tls_version",
    "access_point_arn",
];

/// Closed registry of known `REST.<VERB>.<TARGET>`-shaped operation strings,
/// used for validation only (`spec.md` §3); unknown operations are reported
/// but otherwise left alone.
pub const KNOWN_OPERATION_TYPES: &[&str] = &[
    "REST.GET.OBJECT",
    "REST.PUT.OBJECT",
    "REST.HEAD.OBJECT",
    "REST.DELETE.OBJECT",
    "REST.POST.OBJECT",
    "REST.COPY.OBJECT",
    "REST.COPY.OBJECT_GET",
    "REST.GET.OBJECT_TAGGING",
    "REST.PUT.OBJECT_TAGGING",
    "REST.DELETE.OBJECT_TAGGING",
    "REST.GET.ACL",
    "REST.PUT.ACL",
    "REST.GET.BUCKET",
    "REST.PUT.BUCKET",
    "REST.DELETE.BUCKET",
    "REST.HEAD.BUCKET",
    "REST.GET.BUCKETVERSIONS",
    "REST.GET.BUCKETVERSIONING",
    "REST.PUT.BUCKETVERSIONING",
    "REST.GET.LIFECYCLE",
    "REST.PUT.LIFECYCLE",
    "REST.DELETE.LIFECYCLE",
    "REST.GET.LOCATION",
    "REST.GET.LOGGING_STATUS",
    "REST.PUT.LOGGING_STATUS",
    "REST.GET.POLICY",
    "REST.PUT.POLICY",
    "REST.DELETE.POLICY",
    "REST.GET.REPLICATION",
    "REST.PUT.REPLICATION",
    "REST.DELETE.REPLICATION",
    "REST.GET.REQUEST_PAYMENT",
    "REST.PUT.REQUEST_PAYMENT",
    "REST.GET.TAGGING",
    "REST.PUT.TAGGING",
    "REST.DELETE.TAGGING",
    "REST.GET.VERSIONING",
    "REST.PUT.VERSIONING",
    "REST.GET.WEBSITE",
    "REST.PUT.WEBSITE",
    "REST.DELETE.WEBSITE",
    "REST.GET.CORS",
    "REST.PUT.CORS",
    "REST.DELETE.CORS",
    "REST.GET.ENCRYPTION",
    "REST.PUT.ENCRYPTION",
    "REST.OPTIONS.PREFLIGHT",
    "REST.POST.UPLOADS",
    "REST.PUT.PART",
    "REST.POST.UPLOAD",
    "REST.GET.UPLOAD",
    "REST.DELETE.UPLOAD",
    "REST.POST.MULTI_OBJECT_DELETE",
    "BATCH.DELETE.OBJECT",
    "WEBSITE.GET.OBJECT",
    "WEBSITE.HEAD.OBJECT",
];

fn known_operation_set() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| KNOWN_OPERATION_TYPES.iter().copied().collect())
}

/// Returns whether `operation` is a member of the closed operation-type
/// registry. Used for validation only; the reducer still rejects/accepts
/// lines based on whether `operation` matches the *requested* operation
/// type, independent of registry membership.
pub fn is_known_operation(operation: &str) -> bool {
    known_operation_set().contains(operation)
}

/// A pure function that normalizes a raw object key before it is written to
/// the reduced record.
pub trait ObjectKeyHandler: Send + Sync {
    fn handle(&self, raw_object_key: &str) -> String;
}

/// Passes the object key through unchanged.
#[derive(Default, Clone, Copy)]
pub struct IdentityObjectKeyHandler;

impl ObjectKeyHandler for IdentityObjectKeyHandler {
    fn handle(&self, raw_object_key: &str) -> String {
        raw_object_key.to_owned()
    }
}

/// The DANDI profile: collapses Zarr shard keys (`zarr/<id>/<path>`) to
/// `zarr/<id>`; blob keys (`blobs/<a>/<b>/<id>`) and anything else pass
/// through untouched.
#[derive(Default, Clone, Copy)]
pub struct DandiObjectKeyHandler;

impl ObjectKeyHandler for DandiObjectKeyHandler {
    fn handle(&self, raw_object_key: &str) -> String {
        let mut segments = raw_object_key.splitn(3, '/');
        match (segments.next(), segments.next()) {
            (Some("zarr"), Some(id)) => format!("zarr/{id}"),
            _ => raw_object_key.to_owned(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn known_operation_membership() {
        assert!(is_known_operation("REST.GET.OBJECT"));
        assert!(!is_known_operation("REST.GET.NOTATHING"));
    }

    #[test]
    fn dandi_handler_collapses_zarr_shards() {
        let handler = DandiObjectKeyHandler;
        assert_eq!(handler.handle("zarr/ZID/0/1/2"), "zarr/ZID");
        assert_eq!(handler.handle("blobs/abc/def/XYZ"), "blobs/abc/def/XYZ");
        assert_eq!(handler.handle("zarr"), "zarr");
    }
}
