use async_trait::async_trait;
use contracts::{ContractCall, RevertDebug, H256};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use zk_note::{Ciphertext, ProofArtifact, Submitter};

use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct RelayClient {
    base_url: String,
    reqwest_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteResponse {
    tx_hash: String,
}

#[derive(Debug, Deserialize)]
struct FailureResponse {
    error: String,
    #[serde(default)]
    debug: Option<RevertDebug>,
}

impl RelayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();

        Self {
            base_url,
            reqwest_client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask the relay to submit `signed_action`, returning the transaction hash
    #[tracing::instrument(err, ret, skip(self, signed_action))]
    pub async fn execute(&self, signed_action: &Value) -> Result<H256> {
        let response = self
            .reqwest_client
            .post(format!("{}/execute", self.base_url))
            .json(&json!({ "signedAction": signed_action }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        match status {
            StatusCode::OK => {
                let ok: ExecuteResponse = serde_json::from_str(&body)?;
                parse_tx_hash(&ok.tx_hash)
            }
            StatusCode::BAD_REQUEST => match serde_json::from_str::<FailureResponse>(&body) {
                Ok(failure) => Err(Error::BadRequest(failure.error)),
                Err(_) => Err(Error::BadRequest(body)),
            },
            StatusCode::INTERNAL_SERVER_ERROR => {
                match serde_json::from_str::<FailureResponse>(&body) {
                    Ok(FailureResponse { error, debug }) => Err(Error::Execution {
                        message: error,
                        debug,
                    }),
                    Err(_) => Err(Error::UnexpectedResponse {
                        status: status.as_u16(),
                        body,
                    }),
                }
            }
            status => Err(Error::UnexpectedResponse {
                status: status.as_u16(),
                body,
            }),
        }
    }
}

fn parse_tx_hash(tx_hash: &str) -> Result<H256> {
    let digits = tx_hash.strip_prefix("0x").unwrap_or(tx_hash);

    match hex::decode(digits) {
        Ok(bytes) if bytes.len() == 32 => Ok(H256::from_slice(&bytes)),
        _ => Err(Error::InvalidTxHash(tx_hash.to_owned())),
    }
}

/// The `withdrawV2b` call for a finished proof, as the relay expects it
pub fn withdraw_action(artifact: &ProofArtifact, ciphertext: &Ciphertext) -> ContractCall {
    let public_inputs = artifact
        .public_inputs
        .iter()
        .map(|input| Value::String(input.to_hex()))
        .collect();

    let mut args = Map::new();
    args.insert("proof".to_owned(), Value::String(artifact.proof_hex()));
    args.insert("publicInputs".to_owned(), Value::Array(public_inputs));
    args.insert("ciphertext".to_owned(), Value::String(ciphertext.to_hex()));

    ContractCall {
        function_name: "withdrawV2b".to_owned(),
        args,
    }
}

#[async_trait]
impl Submitter for RelayClient {
    async fn submit_withdrawal(
        &self,
        artifact: &ProofArtifact,
        ciphertext: &Ciphertext,
    ) -> zk_note::Result<H256> {
        let action =
            serde_json::to_value(withdraw_action(artifact, ciphertext)).map_err(Error::from)?;
        Ok(self.execute(&action).await?)
    }
}
