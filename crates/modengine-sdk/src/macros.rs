/// Export a [`HostedModule`](crate::HostedModule) as a loadable module.
///
/// Generates the thirteen `#[no_mangle] extern "C"` entry points of the module
/// ABI. The instance is built by `$ctor` on first use and lives for as long as
/// the library stays loaded. Use it once per cdylib.
///
/// # Example
///
/// ```rust,ignore
/// use modengine_sdk::prelude::*;
///
/// export_module!(MyModule, MyModule::new);
/// ```
#[macro_export]
macro_rules! export_module {
    ($ty:ty, $ctor:expr) => {
        static __MODENGINE_MODULE: ::std::sync::OnceLock<$ty> = ::std::sync::OnceLock::new();

        fn __modengine_module() -> &'static $ty {
            __MODENGINE_MODULE.get_or_init($ctor)
        }

        #[no_mangle]
        pub extern "C" fn mod_get_name() -> *const ::std::ffi::c_char {
            $crate::HostedModule::name(__modengine_module()).as_ptr()
        }

        #[no_mangle]
        pub extern "C" fn mod_get_version() -> *const ::std::ffi::c_char {
            $crate::HostedModule::version(__modengine_module()).as_ptr()
        }

        /// # Safety
        ///
        /// `controls` must be null or valid for the duration of the call.
        #[no_mangle]
        pub unsafe extern "C" fn mod_setup(
            controls: *const $crate::abi::GraphicControls,
            mode: ::std::ffi::c_int,
        ) {
            $crate::ffi::setup(__modengine_module(), controls, mode)
        }

        #[no_mangle]
        pub extern "C" fn logic_run() {
            $crate::HostedModule::logic_run(__modengine_module())
        }

        #[no_mangle]
        pub extern "C" fn logic_close() {
            $crate::HostedModule::logic_close(__modengine_module())
        }

        #[no_mangle]
        pub extern "C" fn graphic_run() {
            $crate::HostedModule::graphic_run(__modengine_module())
        }

        #[no_mangle]
        pub extern "C" fn graphic_close() {
            $crate::HostedModule::graphic_close(__modengine_module())
        }

        /// # Safety
        ///
        /// `filepath` must be null or a valid NUL-terminated string.
        #[no_mangle]
        pub unsafe extern "C" fn conf_save_config(filepath: *const ::std::ffi::c_char) {
            $crate::ffi::with_path(
                __modengine_module(),
                filepath,
                <$ty as $crate::HostedModule>::save_config,
            )
        }

        /// # Safety
        ///
        /// `filepath` must be null or a valid NUL-terminated string.
        #[no_mangle]
        pub unsafe extern "C" fn conf_load_config(filepath: *const ::std::ffi::c_char) {
            $crate::ffi::with_path(
                __modengine_module(),
                filepath,
                <$ty as $crate::HostedModule>::load_config,
            )
        }

        /// # Safety
        ///
        /// `filepath` must be null or a valid NUL-terminated string.
        #[no_mangle]
        pub unsafe extern "C" fn conf_save_setup(filepath: *const ::std::ffi::c_char) {
            $crate::ffi::with_path(
                __modengine_module(),
                filepath,
                <$ty as $crate::HostedModule>::save_setup,
            )
        }

        /// # Safety
        ///
        /// `filepath` must be null or a valid NUL-terminated string.
        #[no_mangle]
        pub unsafe extern "C" fn conf_load_setup(filepath: *const ::std::ffi::c_char) {
            $crate::ffi::with_path(
                __modengine_module(),
                filepath,
                <$ty as $crate::HostedModule>::load_setup,
            )
        }

        #[no_mangle]
        pub extern "C" fn conf_config_form_closing(save_requested: ::std::ffi::c_int) {
            $crate::HostedModule::config_form_closing(
                __modengine_module(),
                $crate::ffi::flag(save_requested),
            )
        }

        #[no_mangle]
        pub extern "C" fn conf_setup_form_closing(save_requested: ::std::ffi::c_int) {
            $crate::HostedModule::setup_form_closing(
                __modengine_module(),
                $crate::ffi::flag(save_requested),
            )
        }
    };
}
