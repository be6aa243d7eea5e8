//! Report RPC surface
//!
//! Hand-written prost message stubs for the node topology report carried to
//! the cluster control point, plus the matching unary client.

pub mod v1 {
    use prost::Message;

    #[derive(Clone, PartialEq, Message)]
    pub struct NodeTopologyRequest {
        #[prost(message, repeated, tag = "1")]
        pub zones: Vec<Zone>,
        #[prost(string, repeated, tag = "2")]
        pub topology_policies: Vec<String>,
        #[prost(string, tag = "3")]
        pub node_name: String,
        #[prost(string, tag = "4")]
        pub agent_version: String,
    }

    #[derive(Clone, PartialEq, Message)]
    pub struct NodeTopologyResponse {}

    #[derive(Clone, PartialEq, Message)]
    pub struct Zone {
        #[prost(string, tag = "1")]
        pub name: String,
        #[prost(string, tag = "2")]
        pub r#type: String,
        #[prost(string, tag = "3")]
        pub parent: String,
        #[prost(message, repeated, tag = "4")]
        pub resources: Vec<ResourceInfo>,
        #[prost(message, repeated, tag = "5")]
        pub costs: Vec<CostInfo>,
    }

    #[derive(Clone, PartialEq, Message)]
    pub struct ResourceInfo {
        #[prost(string, tag = "1")]
        pub name: String,
        #[prost(string, tag = "2")]
        pub allocatable: String,
        #[prost(string, tag = "3")]
        pub capacity: String,
    }

    #[derive(Clone, PartialEq, Message)]
    pub struct CostInfo {
        #[prost(string, tag = "1")]
        pub name: String,
        #[prost(int32, tag = "2")]
        pub value: i32,
    }

    pub mod node_topology_client {
        use super::*;
        use tonic::codegen::*;

        #[derive(Debug, Clone)]
        pub struct NodeTopologyClient<T> {
            inner: tonic::client::Grpc<T>,
        }

        impl NodeTopologyClient<tonic::transport::Channel> {
            pub fn new(channel: tonic::transport::Channel) -> Self {
                let inner = tonic::client::Grpc::new(channel);
                Self { inner }
            }
        }

        impl<T> NodeTopologyClient<T>
        where
            T: tonic::client::GrpcService<tonic::body::BoxBody>,
            T::Error: Into<StdError>,
            T::ResponseBody: Body<Data = Bytes> + Send + 'static,
            <T::ResponseBody as Body>::Error: Into<StdError> + Send,
        {
            pub async fn update_node_topology(
                &mut self,
                request: impl tonic::IntoRequest<NodeTopologyRequest>,
            ) -> Result<tonic::Response<NodeTopologyResponse>, tonic::Status> {
                self.inner.ready().await.map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
                let codec = tonic::codec::ProstCodec::default();
                let path = http::uri::PathAndQuery::from_static(
                    "/topology.v1.NodeTopology/UpdateNodeTopology",
                );
                self.inner.unary(request.into_request(), path, codec).await
            }
        }
    }
}

pub use v1::node_topology_client::NodeTopologyClient;
pub use v1::*;
