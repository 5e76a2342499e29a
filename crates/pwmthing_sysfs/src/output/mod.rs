pub mod duty_cycle;
