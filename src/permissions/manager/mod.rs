/*!
 * Manager Module
 * Central permission manager
 */

mod manager;

pub use manager::PermissionManager;
