pub(crate) mod validation;

pub mod attributes;
pub mod device_class;
pub mod entity_id;
pub mod state;
pub mod state_class;
pub mod unit;

#[doc(no_inline)]
pub use attributes::Attributes;
#[doc(no_inline)]
pub use device_class::DeviceClass;
#[doc(no_inline)]
pub use entity_id::EntityId;
#[doc(no_inline)]
pub use state::{EntityState, RawState};
#[doc(no_inline)]
pub use state_class::StateClass;
#[doc(no_inline)]
pub use unit::UnitOfEnergy;

#[doc(inline)]
pub use validation::ValidationError;
