//! Wire types for the coordinator service.
//!
//! The service stubs are generated by `build.rs` with tonic's manual service
//! builder. Messages are plain serde structs and travel as JSON inside
//! ordinary gRPC frames (`application/grpc`), via [`JsonCodec`].

use std::marker::PhantomData;

use bytes::{Buf, BufMut};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tonic::codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder};
use tonic::Status;

pub mod coordinator {
    include!(concat!(env!("OUT_DIR"), "/mapreduce.Coordinator.rs"));
}

pub use coordinator::coordinator_client::CoordinatorClient;
pub use coordinator::coordinator_server::{Coordinator, CoordinatorServer};

/// The kind of work a task performs. Task ids are only meaningful together
/// with their work type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WorkType {
    Map,
    Reduce,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AcquireTaskRequest {}

/// Everything a worker needs to run one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAssignment {
    pub work_type: WorkType,
    pub task_id: u32,
    pub n_map: u32,
    pub n_reduce: u32,
    /// Input reference of a map task; `None` for reduce tasks.
    pub input: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcquireTaskReply {
    /// Run this task and report it.
    Assigned(TaskAssignment),
    /// Nothing is dispatchable right now, but the job is not finished. Back off
    /// and ask again.
    NoWorkAvailable,
    /// The job is finished; the worker can exit.
    JobDone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportCompletionRequest {
    pub work_type: WorkType,
    pub task_id: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportCompletionReply {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobDoneRequest {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobDoneReply {
    pub done: bool,
}

/////////////////////////////////////////////////////////////////////////////
// JSON codec
/////////////////////////////////////////////////////////////////////////////

#[derive(Debug)]
pub struct JsonEncoder<T>(PhantomData<T>);

impl<T: Serialize> Encoder for JsonEncoder<T> {
    type Item = T;
    type Error = Status;

    fn encode(&mut self, item: Self::Item, buf: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
        serde_json::to_writer(buf.writer(), &item).map_err(|e| Status::internal(e.to_string()))
    }
}

#[derive(Debug)]
pub struct JsonDecoder<U>(PhantomData<U>);

impl<U: DeserializeOwned> Decoder for JsonDecoder<U> {
    type Item = U;
    type Error = Status;

    fn decode(&mut self, buf: &mut DecodeBuf<'_>) -> Result<Option<Self::Item>, Self::Error> {
        if !buf.has_remaining() {
            return Ok(None);
        }
        serde_json::from_reader(buf.reader())
            .map(Some)
            .map_err(|e| Status::invalid_argument(e.to_string()))
    }
}

/// A [`Codec`] carrying serde messages as JSON.
#[derive(Debug, Clone)]
pub struct JsonCodec<T, U>(PhantomData<(T, U)>);

impl<T, U> Default for JsonCodec<T, U> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T, U> Codec for JsonCodec<T, U>
where
    T: Serialize + Send + 'static,
    U: DeserializeOwned + Send + 'static,
{
    type Encode = T;
    type Decode = U;
    type Encoder = JsonEncoder<T>;
    type Decoder = JsonDecoder<U>;

    fn encoder(&mut self) -> Self::Encoder {
        JsonEncoder(PhantomData)
    }

    fn decoder(&mut self) -> Self::Decoder {
        JsonDecoder(PhantomData)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_variants_are_distinguishable_on_the_wire() {
        let replies = [
            AcquireTaskReply::Assigned(TaskAssignment {
                work_type: WorkType::Map,
                task_id: 1,
                n_map: 2,
                n_reduce: 3,
                input: Some("a.txt".into()),
            }),
            AcquireTaskReply::NoWorkAvailable,
            AcquireTaskReply::JobDone,
        ];
        for reply in replies {
            let json = serde_json::to_vec(&reply).unwrap();
            let back: AcquireTaskReply = serde_json::from_slice(&json).unwrap();
            assert_eq!(back, reply);
        }
    }
}
