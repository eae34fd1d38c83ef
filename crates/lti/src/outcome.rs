// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! IMS basic outcome (POX) request parsing and response rendering.

use quick_xml::escape::escape;
use serde::Deserialize;

use crate::error::LtiError;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "imsx_POXHeader")]
    header: Header,
    #[serde(rename = "imsx_POXBody")]
    body: Body,
}

#[derive(Debug, Deserialize)]
struct Header {
    #[serde(rename = "imsx_POXRequestHeaderInfo")]
    info: HeaderInfo,
}

#[derive(Debug, Deserialize)]
struct HeaderInfo {
    #[serde(rename = "imsx_messageIdentifier")]
    message_identifier: String,
}

#[derive(Debug, Deserialize)]
struct Body {
    #[serde(rename = "replaceResultRequest")]
    replace_result_request: Option<ReplaceResultElement>,
}

#[derive(Debug, Deserialize)]
struct ReplaceResultElement {
    #[serde(rename = "resultRecord")]
    result_record: ResultRecord,
}

#[derive(Debug, Deserialize)]
struct ResultRecord {
    #[serde(rename = "sourcedGUID")]
    sourced_guid: SourcedGuid,
    result: Option<ResultElement>,
}

#[derive(Debug, Deserialize)]
struct SourcedGuid {
    #[serde(rename = "sourcedId")]
    sourced_id: String,
}

#[derive(Debug, Deserialize)]
struct ResultElement {
    #[serde(rename = "resultScore")]
    result_score: Option<ResultScore>,
}

#[derive(Debug, Deserialize)]
struct ResultScore {
    #[serde(rename = "textString")]
    text_string: Option<String>,
}

/// A parsed `replaceResultRequest`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceResultRequest {
    /// `imsx_messageIdentifier` of the request.
    pub message_identifier: String,
    /// The assignment id sent as `lis_result_sourcedid`.
    pub assignment_id: i64,
    /// The reported score, when present.
    pub score: Option<f64>,
}

/// Parses a basic outcome `replaceResultRequest` envelope.
///
/// # Errors
///
/// Returns an error if the XML is malformed, is not a replace result
/// request, or carries a non-numeric source id or score.
pub fn parse_replace_result_request(xml: &str) -> Result<ReplaceResultRequest, LtiError> {
    let envelope: Envelope =
        quick_xml::de::from_str(xml).map_err(|e| LtiError::MalformedOutcome(e.to_string()))?;

    let request: ReplaceResultElement = envelope.body.replace_result_request.ok_or_else(|| {
        LtiError::MalformedOutcome(String::from("expected a replaceResultRequest"))
    })?;
    let record: ResultRecord = request.result_record;

    let sourced_id: &str = record.sourced_guid.sourced_id.trim();
    let assignment_id: i64 = sourced_id.parse().map_err(|_| {
        LtiError::MalformedOutcome(format!("sourcedId '{sourced_id}' is not an assignment id"))
    })?;

    let score: Option<f64> = record
        .result
        .and_then(|result| result.result_score)
        .and_then(|score| score.text_string)
        .map(|text| {
            text.trim().parse::<f64>().map_err(|_| {
                LtiError::MalformedOutcome(format!("score '{}' is not a number", text.trim()))
            })
        })
        .transpose()?;

    Ok(ReplaceResultRequest {
        message_identifier: envelope.header.info.message_identifier.trim().to_string(),
        assignment_id,
        score,
    })
}

/// Renders a successful `replaceResultResponse`.
#[must_use]
pub fn replace_result_response(message_identifier: &str, message_ref_identifier: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<imsx_POXEnvelopeResponse xmlns="http://www.imsglobal.org/services/ltiv1p1/xsd/imsoms_v1p0">
    <imsx_POXHeader>
        <imsx_POXResponseHeaderInfo>
            <imsx_version>V1.0</imsx_version>
            <imsx_messageIdentifier>{}</imsx_messageIdentifier>
            <imsx_statusInfo>
                <imsx_codeMajor>success</imsx_codeMajor>
                <imsx_severity>status</imsx_severity>
                <imsx_messageRefIdentifier>{}</imsx_messageRefIdentifier>
                <imsx_operationRefIdentifier>replaceResult</imsx_operationRefIdentifier>
            </imsx_statusInfo>
        </imsx_POXResponseHeaderInfo>
    </imsx_POXHeader>
    <imsx_POXBody>
        <replaceResultResponse/>
    </imsx_POXBody>
</imsx_POXEnvelopeResponse>
"#,
        escape(message_identifier),
        escape(message_ref_identifier)
    )
}
