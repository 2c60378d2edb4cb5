
pub mod dtmf;
pub mod goertzel;
