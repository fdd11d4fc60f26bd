use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::Namespace as KubeNamespace;
use kube::api::ListParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config, ResourceExt};
use tracing::debug;

use crate::model::{Cluster, Namespace};

const IN_CLUSTER_CONTEXT: &str = "in-cluster";

/// Kubeconfig-backed cluster catalog and namespace lookup.
#[derive(Clone)]
pub struct KubeGateway {
    kubeconfig: Option<Kubeconfig>,
}

impl KubeGateway {
    pub fn load() -> Self {
        let kubeconfig = match Kubeconfig::read() {
            Ok(kubeconfig) => Some(kubeconfig),
            Err(error) => {
                debug!("kubeconfig unavailable, falling back to in-cluster config: {error}");
                None
            }
        };
        Self { kubeconfig }
    }

    /// Contexts as deploy targets, current context first.
    pub fn clusters(&self) -> Vec<Cluster> {
        match &self.kubeconfig {
            Some(kubeconfig) => build_clusters(kubeconfig),
            None => vec![Cluster::new(IN_CLUSTER_CONTEXT, IN_CLUSTER_CONTEXT)],
        }
    }

    pub async fn list_namespaces(&self, context: &str) -> Result<Vec<Namespace>> {
        let client = self.client_for(context).await?;
        let api: Api<KubeNamespace> = Api::all(client);
        let list = api
            .list(&list_params())
            .await
            .with_context(|| format!("failed to list namespaces in context {context}"))?;
        Ok(list
            .into_iter()
            .map(|namespace| Namespace::named(namespace.name_any()))
            .collect())
    }

    async fn client_for(&self, context: &str) -> Result<Client> {
        let config = match &self.kubeconfig {
            Some(kubeconfig) => {
                let options = KubeConfigOptions {
                    context: Some(context.to_string()),
                    cluster: None,
                    user: None,
                };
                Config::from_custom_kubeconfig(kubeconfig.clone(), &options)
                    .await
                    .with_context(|| format!("failed to load kubeconfig context {context}"))?
            }
            None => {
                if context != IN_CLUSTER_CONTEXT {
                    anyhow::bail!("kubeconfig not found; context '{context}' is unavailable");
                }
                Config::infer()
                    .await
                    .context("failed to infer Kubernetes configuration")?
            }
        };
        Client::try_from(config).context("failed to initialize Kubernetes client")
    }
}

fn build_clusters(kubeconfig: &Kubeconfig) -> Vec<Cluster> {
    let current = kubeconfig.current_context.as_deref();
    let mut clusters = kubeconfig
        .contexts
        .iter()
        .filter_map(|named| {
            let context = named.context.as_ref()?;
            let label = if context.cluster.is_empty() || context.cluster == named.name {
                named.name.clone()
            } else {
                format!("{} ({})", named.name, context.cluster)
            };
            Some(Cluster::new(named.name.clone(), label))
        })
        .collect::<Vec<_>>();

    clusters.sort_by(|left, right| {
        let left_current = Some(left.name.as_str()) == current;
        let right_current = Some(right.name.as_str()) == current;
        right_current
            .cmp(&left_current)
            .then_with(|| left.name.cmp(&right.name))
    });
    clusters.dedup_by(|left, right| left.name == right.name);
    clusters
}

fn list_params() -> ListParams {
    ListParams::default().limit(500)
}
