//! Fixed query templates
//!
//! Query text is never user-supplied. Identifiers are validated before
//! substitution and the raw-log location is the only free-form value.

use crate::error::{AuditError, Result};

/// External table over CloudTrail JSON records
///
/// Placeholders: `{table}`, `{location}`.
pub const CLOUDTRAIL_TABLE_DDL: &str = "CREATE EXTERNAL TABLE {table} (\
eventVersion STRING, \
userIdentity STRUCT<type: STRING, principalId: STRING, arn: STRING, accountId: STRING, invokedBy: STRING, accessKeyId: STRING, userName: STRING, \
sessionContext: STRUCT<attributes: STRUCT<mfaAuthenticated: STRING, creationDate: STRING>, \
sessionIssuer: STRUCT<type: STRING, principalId: STRING, arn: STRING, accountId: STRING, username: STRING>, \
ec2RoleDelivery: STRING, webIdFederationData: MAP<STRING,STRING>>>, \
eventTime STRING, eventSource STRING, eventName STRING, awsRegion STRING, sourceIpAddress STRING, userAgent STRING, \
errorCode STRING, errorMessage STRING, requestParameters STRING, responseElements STRING, additionalEventData STRING, \
requestId STRING, eventId STRING, \
resources ARRAY<STRUCT<arn: STRING, accountId: STRING, type: STRING>>, \
eventType STRING, apiVersion STRING, readOnly STRING, recipientAccountId STRING, serviceEventDetails STRING, \
sharedEventID STRING, vpcEndpointId STRING, \
tlsDetails STRUCT<tlsVersion: STRING, cipherSuite: STRING, clientProvidedHostHeader: STRING>) \
COMMENT 'CloudTrail S3 data events' \
ROW FORMAT SERDE 'org.apache.hive.hcatalog.data.JsonSerDe' \
STORED AS INPUTFORMAT 'com.amazon.emr.cloudtrail.CloudTrailInputFormat' \
OUTPUTFORMAT 'org.apache.hadoop.hive.ql.io.HiveIgnoreKeyTextOutputFormat' \
LOCATION '{location}' \
TBLPROPERTIES ('classification'='cloudtrail')";

/// Hourly successful PutObject counts per target bucket
///
/// Placeholder: `{table}`.
pub const USAGE_QUERY: &str = "SELECT COUNT(*) AS totalevent, eventname, \
SUBSTR(eventtime, 1, 13) AS eventhour, \
json_extract(requestparameters, '$.bucketName') AS bkt \
FROM {table} \
WHERE eventname = 'PutObject' AND errorcode IS NULL \
GROUP BY eventname, json_extract(requestparameters, '$.bucketName'), SUBSTR(eventtime, 1, 13) \
ORDER BY eventhour";

/// Check that a catalog or table name is a plain SQL identifier
pub fn validate_identifier(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(AuditError::Config(format!("{} name cannot be empty", kind)));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(AuditError::Config(format!(
            "{} name '{}' must contain only ASCII letters, digits and '_'",
            kind, name
        )));
    }
    Ok(())
}

/// Check that a storage location can be embedded in a quoted SQL literal
pub fn validate_location(location: &str) -> Result<()> {
    if !location.starts_with("s3://") || location.len() <= "s3://".len() {
        return Err(AuditError::Config(format!(
            "Location '{}' must be an s3:// URI",
            location
        )));
    }
    if location.contains('\'') {
        return Err(AuditError::Config(format!(
            "Location '{}' must not contain quotes",
            location
        )));
    }
    Ok(())
}

pub fn create_database(catalog: &str) -> Result<String> {
    validate_identifier("Catalog", catalog)?;
    Ok(format!("CREATE DATABASE {}", catalog))
}

/// Render a table DDL template
pub fn render_table_ddl(template: &str, table: &str, location: &str) -> Result<String> {
    validate_identifier("Table", table)?;
    validate_location(location)?;
    Ok(template
        .replace("{table}", table)
        .replace("{location}", location))
}

pub fn usage_query(table: &str) -> Result<String> {
    validate_identifier("Table", table)?;
    Ok(USAGE_QUERY.replace("{table}", table))
}
