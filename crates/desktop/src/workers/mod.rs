pub mod verify_worker;
