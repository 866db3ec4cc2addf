pub mod v4l_camera;
