pub mod verify_use_case;
