mod assemble;
mod init;
mod overlays;
mod owner;

pub use assemble::{assemble_project, AssembleArgs};
pub use init::{init_project, ConfigFormat, InitProjectArgs};
pub use overlays::{list_overlays, ListOverlaysArgs};
pub use owner::{show_owner, ShowOwnerArgs};
