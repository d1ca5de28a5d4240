pub mod device_info;
pub mod poller;

pub use device_info::{first_device, load_device_info, DeviceReport};
pub use poller::{DevicePoller, PollState, PollTransition};
