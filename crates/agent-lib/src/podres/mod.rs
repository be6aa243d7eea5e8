//! Kubelet pod-resources API surface
//!
//! Hand-written prost message stubs mirroring the kubelet's pod-resources
//! v1 API, plus a thin unary client. The kubelet serves this API over a
//! unix domain socket; `connect` builds a channel whose connector always
//! dials that socket.

use std::path::{Path, PathBuf};
use tokio::net::UnixStream;
use tonic::transport::{Channel, Endpoint, Uri};
use tower::service_fn;

pub mod v1 {
    use prost::Message;

    #[derive(Clone, PartialEq, Message)]
    pub struct ListPodResourcesRequest {}

    #[derive(Clone, PartialEq, Message)]
    pub struct ListPodResourcesResponse {
        #[prost(message, repeated, tag = "1")]
        pub pod_resources: Vec<PodResources>,
    }

    #[derive(Clone, PartialEq, Message)]
    pub struct PodResources {
        #[prost(string, tag = "1")]
        pub name: String,
        #[prost(string, tag = "2")]
        pub namespace: String,
        #[prost(message, repeated, tag = "3")]
        pub containers: Vec<ContainerResources>,
    }

    #[derive(Clone, PartialEq, Message)]
    pub struct ContainerResources {
        #[prost(string, tag = "1")]
        pub name: String,
        #[prost(message, repeated, tag = "2")]
        pub devices: Vec<ContainerDevices>,
        #[prost(int64, repeated, tag = "3")]
        pub cpu_ids: Vec<i64>,
    }

    #[derive(Clone, PartialEq, Message)]
    pub struct ContainerDevices {
        #[prost(string, tag = "1")]
        pub resource_name: String,
        #[prost(string, repeated, tag = "2")]
        pub device_ids: Vec<String>,
        #[prost(message, optional, tag = "3")]
        pub topology: Option<TopologyInfo>,
    }

    #[derive(Clone, PartialEq, Message)]
    pub struct TopologyInfo {
        #[prost(message, repeated, tag = "1")]
        pub nodes: Vec<NumaNode>,
    }

    #[derive(Clone, PartialEq, Message)]
    pub struct NumaNode {
        #[prost(int64, tag = "1")]
        pub id: i64,
    }

    #[derive(Clone, PartialEq, Message)]
    pub struct AllocatableResourcesRequest {}

    #[derive(Clone, PartialEq, Message)]
    pub struct AllocatableResourcesResponse {
        #[prost(message, repeated, tag = "1")]
        pub devices: Vec<ContainerDevices>,
        #[prost(int64, repeated, tag = "2")]
        pub cpu_ids: Vec<i64>,
    }

    pub mod pod_resources_lister_client {
        use super::*;
        use tonic::codegen::*;

        #[derive(Debug, Clone)]
        pub struct PodResourcesListerClient<T> {
            inner: tonic::client::Grpc<T>,
        }

        impl PodResourcesListerClient<tonic::transport::Channel> {
            pub fn new(channel: tonic::transport::Channel) -> Self {
                let inner = tonic::client::Grpc::new(channel);
                Self { inner }
            }
        }

        impl<T> PodResourcesListerClient<T>
        where
            T: tonic::client::GrpcService<tonic::body::BoxBody>,
            T::Error: Into<StdError>,
            T::ResponseBody: Body<Data = Bytes> + Send + 'static,
            <T::ResponseBody as Body>::Error: Into<StdError> + Send,
        {
            pub async fn list(
                &mut self,
                request: impl tonic::IntoRequest<ListPodResourcesRequest>,
            ) -> Result<tonic::Response<ListPodResourcesResponse>, tonic::Status> {
                self.inner.ready().await.map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
                let codec = tonic::codec::ProstCodec::default();
                let path = http::uri::PathAndQuery::from_static("/v1.PodResources/List");
                self.inner.unary(request.into_request(), path, codec).await
            }

            pub async fn get_allocatable_resources(
                &mut self,
                request: impl tonic::IntoRequest<AllocatableResourcesRequest>,
            ) -> Result<tonic::Response<AllocatableResourcesResponse>, tonic::Status> {
                self.inner.ready().await.map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
                let codec = tonic::codec::ProstCodec::default();
                let path = http::uri::PathAndQuery::from_static(
                    "/v1.PodResources/GetAllocatableResources",
                );
                self.inner.unary(request.into_request(), path, codec).await
            }
        }
    }
}

pub use v1::pod_resources_lister_client::PodResourcesListerClient;
pub use v1::*;

/// Connect to the kubelet pod-resources endpoint at the given socket path.
///
/// The endpoint URI is a placeholder; the connector ignores it and dials
/// the unix socket.
pub async fn connect(socket_path: impl AsRef<Path>) -> Result<Channel, tonic::transport::Error> {
    let socket_path: PathBuf = socket_path.as_ref().to_path_buf();
    Endpoint::try_from("http://[::1]:0")?
        .connect_with_connector(service_fn(move |_: Uri| {
            UnixStream::connect(socket_path.clone())
        }))
        .await
}
