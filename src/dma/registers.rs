pub mod channel_control_register;
