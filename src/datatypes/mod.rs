// ABOUTME: SMPP v3.4 PDU definitions and protocol enums used by the gateway session engine
// ABOUTME: Each PDU lives in its own module and implements the codec Encodable/Decodable traits

mod bind_transceiver;
mod command_id;
mod command_status;
mod data_coding;
mod deliver_sm;
mod enquire_link;
mod esm_class;
mod generic_nack;
mod interface_version;
mod numeric_plan_indicator;
mod submit_sm;
mod type_of_number;
mod unbind;

pub use bind_transceiver::{BindTransceiver, BindTransceiverResponse};
pub use command_id::CommandId;
pub use command_status::CommandStatus;
pub use data_coding::DataCoding;
pub use deliver_sm::{DeliverSm, DeliverSmResponse};
pub use enquire_link::{EnquireLink, EnquireLinkResponse};
pub use esm_class::EsmClass;
pub use generic_nack::GenericNack;
pub use interface_version::InterfaceVersion;
pub use numeric_plan_indicator::NumericPlanIndicator;
pub use submit_sm::{SubmitSm, SubmitSmResponse};
pub use type_of_number::TypeOfNumber;
pub use unbind::{Unbind, UnbindResponse};
