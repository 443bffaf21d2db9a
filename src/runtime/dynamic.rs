//! Dynamic gRPC invocation for the Forward path.
//!
//! Generated forward handlers carry no compiled prost types; they embed the
//! descriptor set and call through [`unary_json`] / [`server_streaming_json`],
//! which bridge JSON tool arguments to wire-format protobuf with
//! `prost_reflect::DynamicMessage` and a tonic codec over it.

use http::uri::PathAndQuery;
use prost::Message;
use prost_reflect::{DynamicMessage, MessageDescriptor, MethodDescriptor};
use serde_json::Value;
use tonic::codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder};
use tonic::metadata::MetadataMap;
use tonic::transport::Channel;
use tonic::{Request, Status, Streaming};

/// A tonic codec that encodes and decodes [`DynamicMessage`] values against
/// descriptors resolved at runtime.
#[derive(Debug, Clone)]
pub struct DynamicCodec {
    input: MessageDescriptor,
    output: MessageDescriptor,
}

impl DynamicCodec {
    pub fn new(input: MessageDescriptor, output: MessageDescriptor) -> Self {
        Self { input, output }
    }
}

impl Codec for DynamicCodec {
    type Encode = DynamicMessage;
    type Decode = DynamicMessage;
    type Encoder = DynamicEncoder;
    type Decoder = DynamicDecoder;

    fn encoder(&mut self) -> Self::Encoder {
        DynamicEncoder {
            _desc: self.input.clone(),
        }
    }

    fn decoder(&mut self) -> Self::Decoder {
        DynamicDecoder {
            desc: self.output.clone(),
        }
    }
}

#[derive(Debug)]
pub struct DynamicEncoder {
    _desc: MessageDescriptor,
}

impl Encoder for DynamicEncoder {
    type Item = DynamicMessage;
    type Error = Status;

    fn encode(&mut self, item: Self::Item, dst: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
        item.encode(dst)
            .map_err(|err| Status::internal(format!("failed to encode request: {err}")))
    }
}

#[derive(Debug)]
pub struct DynamicDecoder {
    desc: MessageDescriptor,
}

impl Decoder for DynamicDecoder {
    type Item = DynamicMessage;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<Self::Item>, Self::Error> {
        let msg = DynamicMessage::decode(self.desc.clone(), src)
            .map_err(|err| Status::internal(format!("failed to decode response: {err}")))?;
        Ok(Some(msg))
    }
}

/// gRPC request path for a method: `/package.Service/Method`.
pub fn method_path(method: &MethodDescriptor) -> Result<PathAndQuery, Status> {
    let path = format!("/{}/{}", method.parent_service().full_name(), method.name());
    PathAndQuery::from_maybe_shared(path)
        .map_err(|err| Status::internal(format!("invalid method path: {err}")))
}

/// Deserializes JSON tool arguments into the method's request message.
pub fn request_from_json(method: &MethodDescriptor, args: Value) -> Result<DynamicMessage, Status> {
    DynamicMessage::deserialize(method.input(), args)
        .map_err(|err| Status::invalid_argument(format!("invalid arguments: {err}")))
}

/// Invokes a unary method over `channel` with JSON arguments and the given
/// outgoing metadata, returning the response as JSON.
pub async fn unary_json(
    channel: Channel,
    method: &MethodDescriptor,
    args: Value,
    metadata: MetadataMap,
) -> Result<Value, Status> {
    let dyn_req = request_from_json(method, args)?;
    let path = method_path(method)?;
    let codec = DynamicCodec::new(method.input(), method.output());

    let mut grpc = tonic::client::Grpc::new(channel);
    grpc.ready()
        .await
        .map_err(|err| Status::unavailable(format!("backend not ready: {err}")))?;

    let mut request = Request::new(dyn_req);
    *request.metadata_mut() = metadata;

    let response = grpc.unary(request, path, codec).await?;
    serde_json::to_value(response.into_inner())
        .map_err(|err| Status::internal(format!("failed to serialize response: {err}")))
}

/// Invokes a server-streaming method over `channel` with JSON arguments,
/// returning the raw chunk stream for the progress relay to consume.
pub async fn server_streaming_json(
    channel: Channel,
    method: &MethodDescriptor,
    args: Value,
    metadata: MetadataMap,
) -> Result<Streaming<DynamicMessage>, Status> {
    let dyn_req = request_from_json(method, args)?;
    let path = method_path(method)?;
    let codec = DynamicCodec::new(method.input(), method.output());

    let mut grpc = tonic::client::Grpc::new(channel);
    grpc.ready()
        .await
        .map_err(|err| Status::unavailable(format!("backend not ready: {err}")))?;

    let mut request = Request::new(dyn_req);
    *request.metadata_mut() = metadata;

    let response = grpc.server_streaming(request, path, codec).await?;
    Ok(response.into_inner())
}
