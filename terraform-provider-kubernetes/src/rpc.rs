//! Line delimited json requests between terraform and the provider
//!
//! Every line on the input is a request `{"id": .., "method": .., "params": {..}}`. Requests are
//! served concurrently, so responses `{"id": .., "result": ..}` or `{"id": .., "error": ".."}` can
//! be written in a different order than the requests arrived.
use std::{io, sync::Arc};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt},
    sync::mpsc,
    task::JoinSet,
};
use tracing::Instrument;

use crate::{
    config::ProviderConfig,
    data::ResourceData,
    error::{Error, Result},
    migrate::InstanceState,
    provider::Provider,
    timeouts::{Timeouts, TimeoutsConfig},
};

#[derive(Deserialize)]
struct Request {
    #[serde(default)]
    id: Value,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Serialize, Debug)]
struct Response {
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Response {
    fn reply(id: Value, res: Result<Value>) -> Self {
        match res {
            Ok(result) => Self {
                id,
                result: Some(result),
                error: None,
            },
            Err(err) => Self {
                id,
                result: None,
                error: Some(err.to_string()),
            },
        }
    }
}

/// Parameters of the resource operations
#[derive(Deserialize)]
struct ResourceParams {
    type_name: String,
    #[serde(default)]
    id: Option<String>,
    /// Planned attributes, or the current state for read and delete
    #[serde(default)]
    config: Map<String, Value>,
    #[serde(default)]
    prior_state: Option<Map<String, Value>>,
}

impl ResourceParams {
    fn into_data(self) -> Result<(String, ResourceData)> {
        let timeouts = match self.config.get("timeouts") {
            Some(block) => {
                let cfg: TimeoutsConfig = serde_json::from_value(block.clone()).map_err(|source| Error::InvalidRequest {
                    method: "timeouts".into(),
                    source,
                })?;
                Timeouts::default().with_overrides(&cfg)?
            }
            None => Timeouts::default(),
        };
        let mut d = ResourceData::new(self.config).with_timeouts(timeouts);
        if let Some(id) = self.id {
            d.set_id(id);
        }
        if let Some(prior) = self.prior_state {
            d = d.with_prior(prior);
        }
        Ok((self.type_name, d))
    }
}

#[derive(Deserialize)]
struct ImportParams {
    type_name: String,
    id: String,
}

#[derive(Deserialize)]
struct UpgradeParams {
    type_name: String,
    version: u32,
    state: InstanceState,
}

fn params<T: DeserializeOwned>(method: &str, params: Value) -> Result<T> {
    // methods without parameters may omit them
    let params = if params.is_null() { json!({}) } else { params };
    serde_json::from_value(params).map_err(|source| Error::InvalidRequest {
        method: method.into(),
        source,
    })
}

fn state(d: &ResourceData) -> Value {
    json!({ "id": d.id(), "state": d.attrs() })
}

async fn dispatch(provider: &Provider, method: &str, raw: Value) -> Result<Value> {
    match method {
        "configure" => {
            let cfg: ProviderConfig = params(method, raw)?;
            provider.configure(&cfg).await?;
            Ok(Value::Null)
        }
        "get_schema" => serde_json::to_value(provider.schema()).map_err(Error::Encode),
        "create" => {
            let (type_name, mut d) = params::<ResourceParams>(method, raw)?.into_data()?;
            provider.create(&type_name, &mut d).await?;
            Ok(state(&d))
        }
        "read" => {
            let (type_name, mut d) = params::<ResourceParams>(method, raw)?.into_data()?;
            provider.read(&type_name, &mut d).await?;
            Ok(state(&d))
        }
        "update" => {
            let (type_name, mut d) = params::<ResourceParams>(method, raw)?.into_data()?;
            provider.update(&type_name, &mut d).await?;
            Ok(state(&d))
        }
        "delete" => {
            let (type_name, mut d) = params::<ResourceParams>(method, raw)?.into_data()?;
            provider.delete(&type_name, &mut d).await?;
            Ok(state(&d))
        }
        "exists" => {
            let (type_name, d) = params::<ResourceParams>(method, raw)?.into_data()?;
            Ok(Value::Bool(provider.exists(&type_name, &d).await?))
        }
        "import" => {
            let p: ImportParams = params(method, raw)?;
            Ok(state(&provider.import(&p.type_name, &p.id)?))
        }
        "upgrade_state" => {
            let p: UpgradeParams = params(method, raw)?;
            let upgraded = provider.upgrade_state(&p.type_name, p.version, p.state)?;
            serde_json::to_value(upgraded).map_err(Error::Encode)
        }
        "read_data_source" => {
            let (type_name, mut d) = params::<ResourceParams>(method, raw)?.into_data()?;
            provider.read_data_source(&type_name, &mut d).await?;
            Ok(state(&d))
        }
        "stop" => {
            provider.stop();
            Ok(Value::Null)
        }
        other => Err(Error::UnknownMethod(other.into())),
    }
}

/// Serve requests from `input` until it is exhausted
///
/// Returns `output` once every response has been written.
pub async fn serve<R, W>(provider: Arc<Provider>, input: R, output: W) -> io::Result<W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<Response>();
    let writer = tokio::spawn(async move {
        let mut output = output;
        while let Some(response) = rx.recv().await {
            let mut line = serde_json::to_vec(&response)?;
            line.push(b'\n');
            output.write_all(&line).await?;
            output.flush().await?;
        }
        Ok::<_, io::Error>(output)
    });

    let mut tasks = JoinSet::new();
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let request = match serde_json::from_str::<Request>(&line) {
            Ok(request) => request,
            Err(err) => {
                tracing::warn!(error = %err, "malformed request");
                let _ = tx.send(Response {
                    id: Value::Null,
                    result: None,
                    error: Some(format!("malformed request: {err}")),
                });
                continue;
            }
        };
        let span = tracing::info_span!("request", id = %request.id, method = %request.method);
        let provider = provider.clone();
        let tx = tx.clone();
        tasks.spawn(
            async move {
                let res = dispatch(&provider, &request.method, request.params).await;
                if let Err(err) = &res {
                    tracing::warn!(error = %err, "request failed");
                }
                // the writer only stops once every sender is gone
                let _ = tx.send(Response::reply(request.id, res));
            }
            .instrument(span),
        );
    }
    while let Some(joined) = tasks.join_next().await {
        if let Err(err) = joined {
            tracing::error!(error = %err, "request task failed");
        }
    }
    drop(tx);
    writer.await.map_err(io::Error::other)?
}
