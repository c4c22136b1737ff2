/// Implement [`Entity`](crate::mapper::Entity) for a struct by listing the
/// fields to populate. `field => "Column"` matches the field against a
/// differently named column. Unlisted fields keep their `Default` value.
///
/// ```rust
/// use sql_mapper::impl_entity;
///
/// #[derive(Debug, Default)]
/// struct Student {
///     name: String,
///     sex: Option<String>,
///     age: i64,
/// }
///
/// impl_entity!(Student { name, sex => "Gender", age });
/// ```
#[macro_export]
macro_rules! impl_entity {
    ($ty:ty { $($field:ident $(=> $column:literal)?),* $(,)? }) => {
        impl $crate::mapper::Entity for $ty {
            fn descriptor() -> &'static $crate::mapper::TypeDescriptor<Self> {
                static DESCRIPTOR: ::std::sync::LazyLock<$crate::mapper::TypeDescriptor<$ty>> =
                    ::std::sync::LazyLock::new(|| {
                        $crate::mapper::TypeDescriptor::<$ty>::new()
                            $(.mapped_field(
                                ::core::stringify!($field),
                                $crate::__entity_column!($($column)?),
                                |entity: &mut $ty, value: &$crate::RowValues| {
                                    entity.$field = $crate::mapper::FromColumn::from_column(value)?;
                                    ::core::result::Result::Ok(())
                                },
                            ))*
                    });
                &DESCRIPTOR
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __entity_column {
    () => {
        ::core::option::Option::None
    };
    ($column:literal) => {
        ::core::option::Option::Some($column)
    };
}
